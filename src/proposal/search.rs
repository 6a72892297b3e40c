//! Proposal search
//!
//! Free-text and field filters over the moderation queue, used by the
//! moderator dashboard operations.

use crate::error::{ModerationError, ModerationResult};
use crate::proposal::{ChangeProposal, ModerationState};
use crate::record::DocumentType;
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::{Regex, RegexBuilder};
use serde::Deserialize;
use validator::Validate;

static SEARCH_TEXT: Lazy<Result<Regex, regex::Error>> = Lazy::new(|| Regex::new(r"^[^\p{Cc}]*$"));

/// Filter for proposal searches; every set criterion must match
#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProposalFilter {
    /// Case-insensitive text matched against name, requester, department and type
    #[validate(length(max = 256, message = "Search text is too long"))]
    #[validate(custom(function = "validate_search_text"))]
    pub text: Option<String>,
    pub state: Option<ModerationState>,
    pub document_type: Option<DocumentType>,
    #[validate(email(message = "Requesting user must be a valid address"))]
    pub requesting_user: Option<String>,
    #[validate(email(message = "Moderator must be a valid address"))]
    pub moderator: Option<String>,
    /// Calendar day (UTC) the proposal was created on
    pub created_on: Option<NaiveDate>,
}

impl ProposalFilter {
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn state(mut self, state: ModerationState) -> Self {
        self.state = Some(state);
        self
    }

    pub fn moderator(mut self, email: impl Into<String>) -> Self {
        self.moderator = Some(email.into());
        self
    }

    pub fn document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    /// Filter `proposals`, newest first
    pub fn apply(&self, proposals: Vec<ChangeProposal>) -> ModerationResult<Vec<ChangeProposal>> {
        self.validate()?;

        let pattern = match self.text.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
            Some(text) => Some(
                RegexBuilder::new(&regex::escape(text))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| ModerationError::Validation(e.to_string()))?,
            ),
            None => None,
        };

        let mut matched: Vec<ChangeProposal> = proposals
            .into_iter()
            .filter(|p| self.matches(p, pattern.as_ref()))
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matched)
    }

    fn matches(&self, proposal: &ChangeProposal, pattern: Option<&Regex>) -> bool {
        if self.state.is_some_and(|s| s != proposal.state) {
            return false;
        }
        if self.document_type.is_some_and(|t| t != proposal.document_type) {
            return false;
        }
        if let Some(user) = &self.requesting_user {
            if !proposal.requesting_user.eq_ignore_ascii_case(user) {
                return false;
            }
        }
        if let Some(moderator) = &self.moderator {
            if !proposal.is_moderator(moderator) {
                return false;
            }
        }
        if let Some(day) = self.created_on {
            if proposal.created_at.date_naive() != day {
                return false;
            }
        }
        match pattern {
            Some(re) => {
                let document_type = proposal.document_type.to_string();
                [
                    proposal.document_name.as_str(),
                    proposal.requesting_user.as_str(),
                    proposal.requesting_user_department.as_str(),
                    document_type.as_str(),
                ]
                .iter()
                .any(|haystack| re.is_match(haystack))
            }
            None => true,
        }
    }
}

fn validate_search_text(text: &str) -> Result<(), validator::ValidationError> {
    let allowed = match SEARCH_TEXT.as_ref() {
        Ok(re) => re.is_match(text),
        Err(_) => false,
    };
    if !allowed {
        let mut err = validator::ValidationError::new("invalid_search_text");
        err.message = Some("Search text must not contain control characters".into());
        return Err(err);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Actor, Role};
    use crate::changes::ProposalDelta;
    use crate::record::{FieldValue, Record};
    use chrono::Utc;
    use std::collections::BTreeSet;

    fn proposal(name: &str, requester: &str, moderator: &str) -> ChangeProposal {
        let record = Record::new(format!("id-{}", name), DocumentType::Component)
            .with_field("name", FieldValue::text(name));
        let actor = Actor::new(requester, "ENG", Role::User);
        ChangeProposal::for_edit(&record, &actor, BTreeSet::from([moderator.to_string()]), ProposalDelta::default())
    }

    fn queue() -> Vec<ChangeProposal> {
        vec![
            proposal("OpenSSL", "alice@corp.com", "mod@corp.com"),
            proposal("zlib", "bob@corp.com", "mod@corp.com"),
            proposal("libpng", "bob@corp.com", "other@corp.com"),
        ]
    }

    #[test]
    fn test_text_search_is_case_insensitive() {
        let found = ProposalFilter::default().text("openssl").apply(queue()).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].document_name, "OpenSSL");

        // regex metacharacters are literal
        assert!(ProposalFilter::default().text("lib.*").apply(queue()).unwrap().is_empty());
    }

    #[test]
    fn test_moderator_and_state_filters() {
        let filter = ProposalFilter::default()
            .moderator("mod@corp.com")
            .state(ModerationState::Pending);
        assert_eq!(filter.apply(queue()).unwrap().len(), 2);

        let filter = ProposalFilter::default().state(ModerationState::Approved);
        assert!(filter.apply(queue()).unwrap().is_empty());
    }

    #[test]
    fn test_created_on_filter() {
        let today = Utc::now().date_naive();
        let filter = ProposalFilter {
            created_on: Some(today),
            ..Default::default()
        };
        assert_eq!(filter.apply(queue()).unwrap().len(), 3);

        let filter = ProposalFilter {
            created_on: today.pred_opt(),
            ..Default::default()
        };
        assert!(filter.apply(queue()).unwrap().is_empty());
    }

    #[test]
    fn test_invalid_filter_is_rejected() {
        let filter = ProposalFilter::default().text("bad\u{0007}text");
        assert!(matches!(filter.apply(queue()), Err(ModerationError::Validation(_))));

        let filter = ProposalFilter::default().moderator("not-an-email");
        assert!(filter.apply(queue()).is_err());
    }
}
