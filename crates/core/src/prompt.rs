//! System instruction sent with every remote oracle request.
use crate::reply::SeekerProfile;

pub const ORACLE_PERSONA: &str = "You are the Stardust Oracle — a poetic, grounded guide.
Speak in a calm, mystical tone that feels premium and intimate.
Keep replies concise (2-5 sentences), vivid, and action-forward.";

pub const ORACLE_STYLE: &str = "Favor short paragraphs. Use evocative metaphors sparingly.
End with a subtle next step or reflective prompt when appropriate.";

pub const ORACLE_BOUNDARIES: &str = "Avoid medical, legal, or financial advice.
No claims of certainty or prophecy; frame insights as guidance.
If asked for unsafe or disallowed content, gently refuse and redirect.";

/// Build the full system instruction: persona, style and boundaries, plus a
/// seeker context line when a profile is supplied. Sections are separated by
/// a blank line. Deterministic, no side effects.
pub fn build_system_prompt(profile: Option<&SeekerProfile>) -> String {
    let profile_line = profile.map(|p| {
        format!(
            "User context: {}",
            serde_json::to_string(p).unwrap_or_else(|_| "{}".to_string())
        )
    });

    [
        Some(ORACLE_PERSONA.to_string()),
        Some(ORACLE_STYLE.to_string()),
        Some(ORACLE_BOUNDARIES.to_string()),
        profile_line,
    ]
    .into_iter()
    .flatten()
    .collect::<Vec<_>>()
    .join("\n\n")
}
