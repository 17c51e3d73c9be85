//! Penalty trigger detection over `bad` findings.
//!
//! Each trigger owns a case-insensitive pattern and a penalty range. The
//! sharing triggers also count as external sharing for the hard ceiling, as
//! does any finding that mentions sharing with outside parties in general.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

lazy_static! {
    // =========================================================================
    // PENALTY TRIGGERS
    // =========================================================================

    /// Selling, renting or monetizing data; extensive third-party sharing
    static ref DATA_SELLING: Regex = Regex::new(
        r"(?i)\b(sells?|selling|sold|sale\s+of|rent(s|ing)?\s+(out\s+)?(user|personal|customer)|monetiz\w*|data\s+brokers?)\b|\bextensive(ly)?\s+([\w-]+\s+){0,3}shar\w*|\bshar\w*\s+([\w-]+\s+){0,3}with\s+(many|numerous|various|countless|all|hundreds\s+of)\s+(third|external|partner)"
    ).unwrap();

    /// Advertising, marketing or external analytics recipients
    static ref EXTERNAL_ANALYTICS_ADVERTISING: Regex = Regex::new(
        r"(?i)\b(advertis\w*|ad\s+(networks?|partners?|tech|targeting)|targeted\s+ads?|marketing\s+(companies|partners|networks|firms|purposes)|(third[-\s]party|external)\s+analytics|analytics\s+(providers?|companies|services|partners|vendors)|google\s+analytics|(tracking|facebook|meta)\s+pixels?|cross[-\s]site\s+tracking)\b"
    ).unwrap();

    /// Sharing with loosely defined partners or affiliates
    static ref BUSINESS_PARTNERS: Regex = Regex::new(
        r"(?i)\b(business\s+partners?|affiliates?|affiliated\s+(companies|entities)|partner\s+companies|trusted\s+partners|subsidiaries|sister\s+companies|group\s+companies|corporate\s+family)\b"
    ).unwrap();

    /// Retention with no stated limit
    static ref INDEFINITE_RETENTION: Regex = Regex::new(
        r"(?i)\b(indefinite(ly)?|unlimited\s+retention|forever|permanent(ly)?|unclear\s+(data\s+)?retention|no\s+(specific\s+|clear\s+|defined\s+|stated\s+)?retention|as\s+long\s+as\s+(necessary|needed|required|the\s+account))\b|\bretention\b[^.]*\b(unclear|unspecified|not\s+specified|not\s+defined|undefined|not\s+stated|vague)\b"
    ).unwrap();

    /// Retention beyond two years, or longer than needed
    static ref LONG_RETENTION: Regex = Regex::new(
        r"(?i)\b([3-9]|[1-9]\d+)\s*\+?\s*years?\b|\b(three|four|five|six|seven|eight|nine|ten|several|many)\s+years?\b|\b(2[5-9]|[3-9]\d|\d{3,})\s*months\b|\b(more|longer)\s+than\s+(two|2)\s+years\b|\b(over|beyond)\s+(two|2)\s+years\b|\blonger\s+than\s+(necessary|needed|required)\b"
    ).unwrap();

    /// Users cannot delete, export or opt out
    static ref WEAK_DELETION_RIGHTS: Regex = Regex::new(
        r"(?i)\b(cannot|can't|can\s+not|unable\s+to)\s+(easily\s+)?(delete|remove|erase|opt[-\s]out|export|access)\b|\bno\s+(clear\s+|easy\s+|simple\s+)?(way|option|mechanism|process|right)s?\s+to\s+(delete|remove|erase|opt[-\s]out|export|access)\b|\b(limited|weak|poor|unclear|difficult|restricted|no)\s+(user\s+)?(control|deletion|data\s+deletion|opt[-\s]outs?|deletion\s+rights|user\s+rights)\b|\b(does\s+not|doesn't|do\s+not|don't)\s+(allow|permit|offer|provide)\b[^.]*\b(delet\w*|opt[-\s]out|export|eras\w*)"
    ).unwrap();

    // =========================================================================
    // HARD CEILING
    // =========================================================================

    /// Any sharing with outside parties, including the sharing triggers above
    static ref EXTERNAL_SHARING: Regex = Regex::new(
        r"(?i)\bthird[-\s]part(y|ies)\b|\bexternal\s+(companies|parties|partners|services|providers|recipients|vendors|entities)\b|\b(shares?|shared|sharing|discloses?|disclosed|transfers?|transferred|provides?)\b[^.]*\b(with|to)\s+(other\s+companies|outside|external|partners|vendors|service\s+providers|data\s+brokers)"
    ).unwrap();
}

/// A deterministic score reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyTrigger {
    DataSelling,
    ExternalAnalyticsAdvertising,
    BusinessPartners,
    IndefiniteRetention,
    LongRetention,
    WeakDeletionRights,
}

impl PenaltyTrigger {
    /// All triggers, in rubric order.
    pub const ALL: [PenaltyTrigger; 6] = [
        PenaltyTrigger::DataSelling,
        PenaltyTrigger::ExternalAnalyticsAdvertising,
        PenaltyTrigger::BusinessPartners,
        PenaltyTrigger::IndefiniteRetention,
        PenaltyTrigger::LongRetention,
        PenaltyTrigger::WeakDeletionRights,
    ];

    /// Inclusive penalty range in points.
    pub fn range(&self) -> (i64, i64) {
        match self {
            PenaltyTrigger::DataSelling => (40, 65),
            PenaltyTrigger::ExternalAnalyticsAdvertising => (30, 45),
            PenaltyTrigger::BusinessPartners => (25, 35),
            PenaltyTrigger::IndefiniteRetention => (20, 30),
            PenaltyTrigger::LongRetention => (15, 25),
            PenaltyTrigger::WeakDeletionRights => (15, 25),
        }
    }

    /// Whether a match counts as external sharing.
    pub fn is_external_sharing(&self) -> bool {
        matches!(
            self,
            PenaltyTrigger::DataSelling
                | PenaltyTrigger::ExternalAnalyticsAdvertising
                | PenaltyTrigger::BusinessPartners
        )
    }

    /// Whether `statement` matches this trigger.
    pub fn matches(&self, statement: &str) -> bool {
        let pattern: &Regex = match self {
            PenaltyTrigger::DataSelling => &*DATA_SELLING,
            PenaltyTrigger::ExternalAnalyticsAdvertising => &*EXTERNAL_ANALYTICS_ADVERTISING,
            PenaltyTrigger::BusinessPartners => &*BUSINESS_PARTNERS,
            PenaltyTrigger::IndefiniteRetention => &*INDEFINITE_RETENTION,
            PenaltyTrigger::LongRetention => &*LONG_RETENTION,
            PenaltyTrigger::WeakDeletionRights => &*WEAK_DELETION_RIGHTS,
        };
        pattern.is_match(statement)
    }

    /// Point within the range for `matches` distinct findings.
    ///
    /// One finding takes the minimum, two the midpoint, three or more the
    /// maximum.
    pub fn penalty_for(&self, matches: usize) -> i64 {
        if matches == 0 {
            return 0;
        }
        let (min, max) = self.range();
        let severity = matches.min(3) as i64 - 1;
        min + (max - min) * severity / 2
    }

    pub fn label(&self) -> &'static str {
        match self {
            PenaltyTrigger::DataSelling => "data selling or extensive third-party sharing",
            PenaltyTrigger::ExternalAnalyticsAdvertising => {
                "external analytics or advertising sharing"
            }
            PenaltyTrigger::BusinessPartners => "sharing with vaguely defined business partners",
            PenaltyTrigger::IndefiniteRetention => "indefinite or unclear retention",
            PenaltyTrigger::LongRetention => "retention longer than two years",
            PenaltyTrigger::WeakDeletionRights => "weak deletion or control rights",
        }
    }
}

impl fmt::Display for PenaltyTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Check if a finding describes sharing data outside the service.
pub fn contains_external_sharing(statement: &str) -> bool {
    EXTERNAL_SHARING.is_match(statement)
        || PenaltyTrigger::ALL
            .iter()
            .filter(|t| t.is_external_sharing())
            .any(|t| t.matches(statement))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triggers_for(statement: &str) -> Vec<PenaltyTrigger> {
        PenaltyTrigger::ALL
            .into_iter()
            .filter(|t| t.matches(statement))
            .collect()
    }

    #[test]
    fn test_data_selling() {
        assert_eq!(
            triggers_for("The company sells personal data to brokers"),
            vec![PenaltyTrigger::DataSelling]
        );
        assert!(PenaltyTrigger::DataSelling.matches("Extensive third-party sharing"));
        assert!(!PenaltyTrigger::DataSelling.matches("Does not share data"));
    }

    #[test]
    fn test_advertising() {
        assert_eq!(
            triggers_for("Shares data with advertising networks"),
            vec![PenaltyTrigger::ExternalAnalyticsAdvertising]
        );
        assert!(PenaltyTrigger::ExternalAnalyticsAdvertising.matches("Uses Google Analytics"));
    }

    #[test]
    fn test_business_partners() {
        assert!(PenaltyTrigger::BusinessPartners.matches("Data shared with affiliates"));
        assert!(PenaltyTrigger::BusinessPartners.matches("Disclosed to our business partners"));
    }

    #[test]
    fn test_retention() {
        assert!(PenaltyTrigger::IndefiniteRetention.matches("Data retained indefinitely"));
        assert!(PenaltyTrigger::IndefiniteRetention.matches("Retention period is not specified"));
        assert!(PenaltyTrigger::LongRetention.matches("Logs kept for 5 years"));
        assert!(PenaltyTrigger::LongRetention.matches("Kept for more than two years"));
        assert!(PenaltyTrigger::LongRetention.matches("Stored for 36 months"));
        assert!(!PenaltyTrigger::LongRetention.matches("Stored for 2 years"));
        assert!(!PenaltyTrigger::LongRetention.matches("Deleted after 90 days"));
    }

    #[test]
    fn test_weak_deletion() {
        assert!(PenaltyTrigger::WeakDeletionRights.matches("Users cannot delete their account"));
        assert!(PenaltyTrigger::WeakDeletionRights.matches("No way to opt-out of tracking"));
        assert!(PenaltyTrigger::WeakDeletionRights.matches("Limited user control"));
        assert!(PenaltyTrigger::WeakDeletionRights.matches("Does not allow users to export data"));
    }

    #[test]
    fn test_penalty_interpolation() {
        let t = PenaltyTrigger::DataSelling;
        assert_eq!(t.penalty_for(0), 0);
        assert_eq!(t.penalty_for(1), 40);
        assert_eq!(t.penalty_for(2), 52);
        assert_eq!(t.penalty_for(3), 65);
        assert_eq!(t.penalty_for(10), 65);
    }

    #[test]
    fn test_external_sharing() {
        assert!(contains_external_sharing("Shares data with third parties"));
        assert!(contains_external_sharing("Uses Google Analytics"));
        assert!(contains_external_sharing("Information transferred to service providers"));
        assert!(!contains_external_sharing("Keeps logs for 5 years"));
        assert!(!contains_external_sharing("Users cannot delete their account"));
    }
}
