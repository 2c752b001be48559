//! Decision policy. Pure functions without I/O.

use RuleOutcome::{AutoReject, AutoVerify, ManualReview};
use VerdictOutcome::{No, Unavailable, Yes};
use model::{Verdict, VerdictListExt, VerdictOutcome, VerdictSource, VerificationDecision};

/// Result of one decision table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Classifiers verified the report.
    AutoVerify,
    /// Classifiers rejected the report. Goes to the AI-Rejected queue.
    AutoReject,
    /// Classifiers could not decide. Goes to the Manual-Pending queue.
    ManualReview,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecisionRule {
    pub ai: VerdictOutcome,
    /// None when the pipeline has no disaster classifier.
    pub ml: Option<VerdictOutcome>,
    pub outcome: RuleOutcome,
    pub reason: &'static str,
}

impl DecisionRule {
    const fn new(
        ai: VerdictOutcome,
        ml: Option<VerdictOutcome>,
        outcome: RuleOutcome,
        reason: &'static str,
    ) -> Self {
        Self {
            ai,
            ml,
            outcome,
            reason,
        }
    }

    fn decision(&self) -> VerificationDecision {
        let (verified, requires_manual_verification, auto_verified) = match self.outcome {
            RuleOutcome::AutoVerify => (true, false, true),
            RuleOutcome::AutoReject => (false, true, true),
            RuleOutcome::ManualReview => (false, true, false),
        };
        VerificationDecision {
            verified,
            requires_manual_verification,
            auto_verified,
            is_spam: false,
            reason: self.reason.to_string(),
        }
    }
}

pub const REASON_MEDIA: &str = "media requires manual verification";
pub const REASON_UNAVAILABLE: &str = "validator unavailable";
pub const REASON_SPAM_SUFFIX: &str = "flagged as spam by ML classifier";

/// Every combination of AI verdict and optional ML disaster verdict. The
/// AI verdict is authoritative when it is available.
pub const DECISION_TABLE: [DecisionRule; 12] = [
    // Fast pipeline
    DecisionRule::new(Yes, None, AutoVerify, "verified by AI"),
    DecisionRule::new(No, None, AutoReject, "rejected by AI"),
    DecisionRule::new(Unavailable, None, ManualReview, REASON_UNAVAILABLE),
    // Full pipeline
    DecisionRule::new(
        Yes,
        Some(Yes),
        AutoVerify,
        "verified by AI, confirmed by ML classifier",
    ),
    DecisionRule::new(
        Yes,
        Some(No),
        AutoVerify,
        "verified by AI, ML classifier disagreed",
    ),
    DecisionRule::new(Yes, Some(Unavailable), AutoVerify, "verified by AI"),
    DecisionRule::new(No, Some(Yes), ManualReview, "AI and ML classifier disagree"),
    DecisionRule::new(
        No,
        Some(No),
        AutoReject,
        "rejected by AI, confirmed by ML classifier",
    ),
    DecisionRule::new(No, Some(Unavailable), AutoReject, "rejected by AI"),
    DecisionRule::new(Unavailable, Some(Yes), AutoVerify, "verified by ML classifier"),
    DecisionRule::new(Unavailable, Some(No), AutoReject, "rejected by ML classifier"),
    DecisionRule::new(
        Unavailable,
        Some(Unavailable),
        ManualReview,
        REASON_UNAVAILABLE,
    ),
];

const FALLBACK_RULE: DecisionRule =
    DecisionRule::new(Unavailable, None, ManualReview, REASON_UNAVAILABLE);

pub fn media_decision() -> VerificationDecision {
    VerificationDecision {
        verified: false,
        requires_manual_verification: true,
        auto_verified: false,
        is_spam: false,
        reason: REASON_MEDIA.to_string(),
    }
}

/// Compute the verification decision.
///
/// Reports with media always need manual verification and `verdicts` is
/// ignored. A missing AI verdict counts as unavailable. The spam verdict
/// only affects decisions which did not verify the report.
pub fn decide(verdicts: &[Verdict], has_media: bool) -> VerificationDecision {
    if has_media {
        return media_decision();
    }

    let ai = verdicts
        .outcome_of(VerdictSource::AiTextValidator)
        .unwrap_or(Unavailable);
    let ml = verdicts.outcome_of(VerdictSource::MlDisasterClassifier);

    let rule = DECISION_TABLE
        .iter()
        .find(|r| r.ai == ai && r.ml == ml)
        .unwrap_or(&FALLBACK_RULE);
    let mut decision = rule.decision();

    if !decision.verified && verdicts.outcome_of(VerdictSource::MlSpamClassifier) == Some(Yes) {
        decision.is_spam = true;
        decision.reason = format!("{}, {}", decision.reason, REASON_SPAM_SUFFIX);
    }

    decision
}
