//! Verdict extraction from free-form reviewer output.

/// Outcome of one review round.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Approve,
    /// The reviewer rejected the artifact; `reason` feeds the next round.
    Revise { reason: String },
}

impl Verdict {
    pub fn is_approve(&self) -> bool {
        matches!(self, Verdict::Approve)
    }
}

/// Parse a reviewer's raw text into a [`Verdict`].
///
/// Scans line by line for `VERDICT:` and `REASON:` markers, case
/// insensitively. Only an explicit `approve`/`approved` verdict approves;
/// anything else, including missing or garbled markers, is treated as a
/// revision request so a malformed reviewer can never wave work through.
pub fn parse_verdict(raw: &str) -> Verdict {
    let mut verdict_value: Option<String> = None;
    let mut reason: Option<String> = None;

    for line in raw.lines() {
        let trimmed = line.trim();
        let lower = trimmed.to_ascii_lowercase();
        if let Some(rest) = lower.strip_prefix("verdict:") {
            verdict_value = Some(rest.trim().to_string());
        } else if lower.starts_with("reason:") {
            // Preserve the original casing of the reason text.
            reason = Some(trimmed[7..].trim().to_string());
        }
    }

    match verdict_value.as_deref() {
        Some("approve") | Some("approved") => Verdict::Approve,
        Some(other) => Verdict::Revise {
            reason: reason.unwrap_or_else(|| format!("unrecognized verdict {other:?}")),
        },
        None => Verdict::Revise {
            reason: reason.unwrap_or_else(|| "reviewer output carried no verdict".to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn approve_is_recognized() {
        assert_eq!(parse_verdict("VERDICT: approve"), Verdict::Approve);
        assert_eq!(parse_verdict("verdict: Approved"), Verdict::Approve);
    }

    #[test]
    fn markers_are_found_anywhere_in_the_text() {
        let raw = "Looks mostly fine.\nVERDICT: revise\nREASON: tighten the intro\n";
        assert_eq!(
            parse_verdict(raw),
            Verdict::Revise {
                reason: "tighten the intro".to_string()
            }
        );
    }

    #[test]
    fn missing_verdict_fails_closed() {
        let verdict = parse_verdict("great work, ship it");
        assert!(matches!(verdict, Verdict::Revise { .. }));
    }

    #[test]
    fn unknown_verdict_value_fails_closed() {
        let verdict = parse_verdict("VERDICT: maybe");
        match verdict {
            Verdict::Revise { reason } => assert!(reason.contains("maybe")),
            other => panic!("expected Revise, got {other:?}"),
        }
    }

    #[test]
    fn reason_keeps_original_casing() {
        let raw = "VERDICT: revise\nREASON: Cite RFC 2119 properly";
        match parse_verdict(raw) {
            Verdict::Revise { reason } => assert_eq!(reason, "Cite RFC 2119 properly"),
            other => panic!("expected Revise, got {other:?}"),
        }
    }
}
