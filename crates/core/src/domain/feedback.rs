// Feedback Domain Model
// Review left by a requester after leaving a destination's line

use crate::domain::destination::DestinationId;
use crate::domain::error::{DomainError, Result};
use crate::domain::identity::RequesterId;
use serde::{Deserialize, Serialize};

pub const MAX_COMMENT_LEN: usize = 500;

/// Star rating (1-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Rating(u8);

impl Rating {
    pub fn new(stars: i64) -> Result<Self> {
        if !(1..=5).contains(&stars) {
            return Err(DomainError::InvalidRating(stars));
        }
        Ok(Self(stars as u8))
    }

    pub fn stars(self) -> u8 {
        self.0
    }
}

impl TryFrom<i64> for Rating {
    type Error = DomainError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Rating> for i64 {
    fn from(rating: Rating) -> Self {
        i64::from(rating.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feedback {
    pub destination: DestinationId,
    pub requester: RequesterId,
    pub rating: Rating,
    pub comment: String,
    pub submitted_at: i64, // epoch ms
}

impl Feedback {
    pub fn new(
        destination: DestinationId,
        requester: RequesterId,
        rating: Rating,
        comment: impl Into<String>,
        submitted_at: i64,
    ) -> Result<Self> {
        let comment = comment.into().trim().to_string();
        if comment.chars().count() > MAX_COMMENT_LEN {
            return Err(DomainError::ValidationError(format!(
                "Comment too long (max {} characters)",
                MAX_COMMENT_LEN
            )));
        }
        Ok(Self {
            destination,
            requester,
            rating,
            comment,
            submitted_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rating_range() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(5).unwrap().stars(), 5);
    }

    #[test]
    fn test_comment_is_trimmed_and_bounded() {
        let dest = DestinationId::from_name("Zoo");
        let fb = Feedback::new(
            dest.clone(),
            RequesterId::new("r1"),
            Rating::new(4).unwrap(),
            "  great  ",
            1,
        )
        .unwrap();
        assert_eq!(fb.comment, "great");

        let too_long = "x".repeat(MAX_COMMENT_LEN + 1);
        assert!(Feedback::new(dest, RequesterId::new("r1"), Rating::new(4).unwrap(), too_long, 1)
            .is_err());
    }
}
