/// Maximum message content length (bytes).
pub const MAX_MESSAGE_LENGTH: usize = 2000;

/// Maximum room display-name length.
pub const MAX_ROOM_NAME_LENGTH: usize = 50;

/// Maximum username length.
pub const MAX_USERNAME_LENGTH: usize = 32;

/// Minimum username length.
pub const MIN_USERNAME_LENGTH: usize = 2;

/// Validate a username. Must be 2-32 chars, alphanumeric + underscore/hyphen.
pub fn validate_username(name: &str) -> Result<(), String> {
    if name.len() < MIN_USERNAME_LENGTH {
        return Err(format!(
            "Username too short (min {} characters)",
            MIN_USERNAME_LENGTH
        ));
    }
    if name.len() > MAX_USERNAME_LENGTH {
        return Err(format!(
            "Username too long (max {} characters)",
            MAX_USERNAME_LENGTH
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-')
    {
        return Err("Username can only contain letters, numbers, underscores, and hyphens".into());
    }
    Ok(())
}

/// Validate a room display name. Non-empty after trimming, bounded length.
pub fn validate_room_name(name: &str) -> Result<(), String> {
    if name.trim().is_empty() {
        return Err("Room name cannot be empty".into());
    }
    if name.len() > MAX_ROOM_NAME_LENGTH {
        return Err(format!(
            "Room name too long (max {} characters)",
            MAX_ROOM_NAME_LENGTH
        ));
    }
    Ok(())
}

/// Validate message content. Must be non-empty and under the length limit.
pub fn validate_message(content: &str) -> Result<(), String> {
    if content.trim().is_empty() {
        return Err("Message cannot be empty".into());
    }
    if content.len() > MAX_MESSAGE_LENGTH {
        return Err(format!(
            "Message too long (max {} characters)",
            MAX_MESSAGE_LENGTH
        ));
    }
    Ok(())
}

/// Escape HTML metacharacters so stored text is safe to render verbatim.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}
