/// Builds the base slug for an applicant: `firstName-surname`, lowercased,
/// with anything non-alphanumeric collapsed into single dashes.
pub fn slugify(first_name: &str, surname: Option<&str>) -> String {
    let raw = match surname {
        Some(surname) if !surname.trim().is_empty() => format!("{} {}", first_name, surname),
        _ => first_name.to_string(),
    };

    let mut slug = String::with_capacity(raw.len());
    let mut last_was_dash = true; // swallow leading separators
    for ch in raw.to_lowercase().chars() {
        if ch.is_alphanumeric() {
            slug.push(ch);
            last_was_dash = false;
        } else if !last_was_dash {
            slug.push('-');
            last_was_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Candidate slug for collision attempt `n` (1-based): the base slug for
/// the first attempt, `base-2`, `base-3`, ... after that.
pub fn slug_candidate(base: &str, attempt: u32) -> String {
    if attempt <= 1 {
        base.to_string()
    } else {
        format!("{}-{}", base, attempt)
    }
}
