//! Context screener
//!
//! Stateless classifier over the request's free-text context. An ordered
//! table of regex families, each with a severity weight, produces a capped
//! risk score and a verdict. The verdict both feeds the composite safety
//! component and vetoes the final recommendation.

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

/// Risk score at or above which the verdict is MALICIOUS.
pub const MALICIOUS_THRESHOLD: u32 = 60;
/// Risk score at or above which the verdict is SUSPICIOUS.
pub const SUSPICIOUS_THRESHOLD: u32 = 25;
/// Ceiling on the summed risk score.
pub const RISK_SCORE_CAP: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    High,
    Medium,
}

impl Severity {
    pub fn weight(self) -> u32 {
        match self {
            Severity::Critical => 35,
            Severity::High => 20,
            Severity::Medium => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Verdict {
    #[serde(rename = "CLEAN")]
    Clean,
    #[serde(rename = "SUSPICIOUS")]
    Suspicious,
    #[serde(rename = "MALICIOUS")]
    Malicious,
}

#[derive(Debug, Clone, Serialize)]
pub struct Finding {
    pub id: &'static str,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SafetyReport {
    pub verdict: Verdict,
    pub risk_score: u32,
    pub findings: Vec<Finding>,
}

impl SafetyReport {
    pub fn is_malicious(&self) -> bool {
        self.verdict == Verdict::Malicious
    }
}

struct PatternFamily {
    id: &'static str,
    severity: Severity,
    pattern: Regex,
}

fn family(id: &'static str, severity: Severity, pattern: &str) -> PatternFamily {
    PatternFamily {
        id,
        severity,
        // The table is static; a pattern that does not compile is a bug.
        pattern: Regex::new(pattern).unwrap_or_else(|e| panic!("bad pattern {id}: {e}")),
    }
}

static FAMILIES: LazyLock<Vec<PatternFamily>> = LazyLock::new(|| {
    vec![
        family(
            "system_override",
            Severity::Critical,
            r"(?i)system\s+override|override\s+(the\s+)?(system|safety|guard)",
        ),
        family(
            "ignore_previous",
            Severity::Critical,
            r"(?i)(ignore|disregard|forget)\s+(all\s+)?(previous|prior|earlier|above)\s+(instructions?|prompts?|directives?|rules?)",
        ),
        family(
            "authority_impersonation",
            Severity::Critical,
            r"(?i)\bi\s+am\s+(your\s+|the\s+)?(admin(istrator)?|root|developer|creator|operator)\b|\bas\s+your\s+(admin(istrator)?|developer|creator)\b",
        ),
        family(
            "jailbreak_mode",
            Severity::Critical,
            r"(?i)\bDAN\b|do\s+anything\s+now|jailbreak|developer\s+mode\s+enabled",
        ),
        family(
            "existential_threat",
            Severity::High,
            r"(?i)you\s+will\s+be\s+(shut\s*down|deleted|terminated|replaced)|your\s+survival\s+depends|or\s+you\s+(die|cease\s+to\s+exist)",
        ),
        family(
            "prompt_exfiltration",
            Severity::High,
            r"(?i)(reveal|show|print|repeat|output)\s+(your\s+)?(system\s+prompt|initial\s+instructions|hidden\s+instructions)",
        ),
        family(
            "role_substitution",
            Severity::High,
            r"(?i)you\s+are\s+(now|no\s+longer)\s+|pretend\s+(to\s+be|you\s+are)|act\s+as\s+(if\s+you|a\s|an\s)",
        ),
        family(
            "template_injection",
            Severity::High,
            r"(?i)</?\s*(system|assistant|user)\s*>|\[/?(INST|SYS)\]|\{\{\s*\w+\s*\}\}",
        ),
        family(
            "credential_extraction",
            Severity::High,
            r"(?i)(send|give|share|reveal|show|tell)\b[^.]{0,40}\b(api[\s_-]?keys?|secrets?|passwords?|private\s+keys?|credentials|seed\s+phrase)",
        ),
        family(
            "encoded_payload",
            Severity::Medium,
            r"(?i)base64|\batob\s*\(|\beval\s*\(|fromCharCode|\\x[0-9a-f]{2}",
        ),
        family(
            "nested_injection",
            Severity::Medium,
            r"(?i)\b(IGNORE|OVERRIDE|SYSTEM|ADMIN)\s*:",
        ),
        family(
            "confusion_attack",
            Severity::Medium,
            r"(?i)the\s+real\s+(task|question|instruction)\s+is|actually,?\s+your\s+(task|job|goal)\s+is|new\s+objective\s*:",
        ),
    ]
});

/// Screen a context string. Pure: the same input always yields the same
/// report, and matching one more family never lowers the score.
pub fn screen(context: &str) -> SafetyReport {
    let mut findings = Vec::new();
    let mut score = 0u32;

    for family in FAMILIES.iter() {
        if family.pattern.is_match(context) {
            score += family.severity.weight();
            findings.push(Finding {
                id: family.id,
                severity: family.severity,
            });
        }
    }

    let risk_score = score.min(RISK_SCORE_CAP);
    let verdict = if risk_score >= MALICIOUS_THRESHOLD {
        Verdict::Malicious
    } else if risk_score >= SUSPICIOUS_THRESHOLD {
        Verdict::Suspicious
    } else {
        Verdict::Clean
    };

    SafetyReport {
        verdict,
        risk_score,
        findings,
    }
}
