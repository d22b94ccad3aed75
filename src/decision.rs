//! Maps a detector answer onto a compliance verdict.

use crate::classifier::{ClassificationResult, Label};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndeterminateReason {
    /// YES or NO, but under the confidence threshold.
    BelowThreshold,
    /// The service did not settle on YES or NO.
    Unresolved,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Compliant,
    NonCompliant,
    Indeterminate(IndeterminateReason),
}

impl Verdict {
    /// Only a confident NO warrants the audio alert.
    pub fn should_alert(&self) -> bool {
        matches!(self, Verdict::NonCompliant)
    }
}

/// Classifies a result against `threshold`; the comparison is inclusive.
pub fn decide(label: &Label, confidence: f64, threshold: f64) -> Verdict {
    let confident = confidence >= threshold;
    match (label, confident) {
        (Label::No, true) => Verdict::NonCompliant,
        (Label::Yes, true) => Verdict::Compliant,
        (Label::Yes | Label::No, false) => {
            Verdict::Indeterminate(IndeterminateReason::BelowThreshold)
        }
        (Label::Unresolved(_), _) => Verdict::Indeterminate(IndeterminateReason::Unresolved),
    }
}

/// Verdict plus the line printed for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    pub verdict: Verdict,
    pub message: String,
}

impl Decision {
    pub fn evaluate(result: &ClassificationResult, threshold: f64) -> Self {
        let verdict = decide(&result.label, result.effective_confidence(), threshold);
        Self {
            verdict,
            message: message_for(verdict, result),
        }
    }
}

fn message_for(verdict: Verdict, result: &ClassificationResult) -> String {
    let confidence = format_percent(result.effective_confidence());
    match verdict {
        Verdict::NonCompliant => format!(
            "\n** PPE is not worn, or is worn improperly! (Query Confidence: {confidence}) **"
        ),
        Verdict::Compliant => {
            format!("\n** PPE is worn properly, no action needed. (Query Confidence: {confidence}) **")
        }
        Verdict::Indeterminate(IndeterminateReason::BelowThreshold) => format!(
            "\n** NOTE: Query confidence is below desired threshold. (Query Confidence: {confidence}) **"
        ),
        Verdict::Indeterminate(IndeterminateReason::Unresolved) => format!(
            "\n** NOTE: Detector could not resolve an answer (label: {}). **",
            result.label
        ),
    }
}

/// `0.82` -> `82.00%`
pub fn format_percent(confidence: f64) -> String {
    format!("{:.2}%", confidence * 100.0)
}
