use sha2::{Digest, Sha256};

fn digest(parts: &[&str]) -> [u8; 32] {
    let mut h = Sha256::new();
    for (i, p) in parts.iter().enumerate() {
        if i > 0 {
            h.update(b":");
        }
        h.update(p.as_bytes());
    }
    h.finalize().into()
}

/// Invite code like `2b46-55715`. `attempt` varies the code when the first
/// pick collides with an existing group.
pub fn invite_code(group_id: &str, attempt: u32) -> String {
    let d = digest(&[group_id, &attempt.to_string()]);
    let n = u32::from_be_bytes([d[2], d[3], d[4], d[5]]) % 100_000;
    format!("{:02x}{:02x}-{:05}", d[0], d[1], n)
}

/// Meeting link like `https://meet.google.com/abc-defg-hij`.
pub fn meet_link(assessment_id: &str) -> String {
    let d = digest(&["meet", assessment_id]);
    let letters: String = d
        .iter()
        .take(10)
        .map(|b| (b'a' + b % 26) as char)
        .collect();
    format!(
        "https://meet.google.com/{}-{}-{}",
        &letters[0..3],
        &letters[3..7],
        &letters[7..10]
    )
}
