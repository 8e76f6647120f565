//! Restaurant reviews, always presented as three good, one medium and one
//! bad review so a page never looks empty or one-sided.

use chrono::{Duration, SecondsFormat, Utc};

use crate::app::errors::AppError;
use crate::app::App;
use crate::eid::Eid;
use crate::model::{NewReview, Review, ReviewAuthor};

const GOOD: usize = 3;

struct Placeholder {
    rating: u8,
    author: &'static str,
    comment: &'static str,
}

const GOOD_REVIEW: Placeholder = Placeholder {
    rating: 5,
    author: "Excepcional!",
    comment: "Ótima comida e serviço excelente. Recomendo muito.",
};

const MEDIUM_REVIEW: Placeholder = Placeholder {
    rating: 3,
    author: "Razoável",
    comment: "A comida estava ok, mas o atendimento deixou a desejar um pouco.",
};

const BAD_REVIEW: Placeholder = Placeholder {
    rating: 1,
    author: "Decepção",
    comment: "Demorou muito para chegar e veio frio. Não volto mais.",
};

fn placeholder(restaurant_id: &str, p: &Placeholder, avatar: u32, days_ago: i64) -> Review {
    Review {
        id: Eid::with_prefix(&format!("mock-rev-{}", p.rating)).to_string(),
        user_id: format!("mock-user-{}", p.rating),
        restaurant_id: restaurant_id.to_string(),
        rating: p.rating,
        comment: Some(p.comment.to_string()),
        menu_item_id: None,
        photo_url: None,
        created_at: (Utc::now() - Duration::days(days_ago))
            .to_rfc3339_opts(SecondsFormat::Millis, true),
        user: Some(ReviewAuthor {
            name: p.author.to_string(),
            avatar_url: Some(format!("https://i.pravatar.cc/150?img={avatar}")),
            level: Some("Crítico".to_string()),
        }),
    }
}

/// Picks real reviews by rating band (newest first as given) and fills the
/// missing slots with placeholders.
pub fn distribute(real: Vec<Review>, restaurant_id: &str) -> Vec<Review> {
    let mut good = Vec::new();
    let mut medium = None;
    let mut bad = None;

    for review in real {
        match review.rating {
            4.. if good.len() < GOOD => good.push(review),
            3 if medium.is_none() => medium = Some(review),
            0..=2 if bad.is_none() => bad = Some(review),
            _ => {}
        }
    }

    let mut result = Vec::with_capacity(GOOD + 2);
    let mut good = good.into_iter();
    for i in 0..GOOD {
        result.push(
            good.next()
                .unwrap_or_else(|| placeholder(restaurant_id, &GOOD_REVIEW, 10 + i as u32, 3 + i as i64)),
        );
    }
    result.push(medium.unwrap_or_else(|| placeholder(restaurant_id, &MEDIUM_REVIEW, 20, 12)));
    result.push(bad.unwrap_or_else(|| placeholder(restaurant_id, &BAD_REVIEW, 30, 40)));
    result
}

/// Mean rounded to one decimal.
pub fn average_rating(ratings: &[u8]) -> Option<f64> {
    if ratings.is_empty() {
        return None;
    }
    let sum: u32 = ratings.iter().map(|r| *r as u32).sum();
    let avg = sum as f64 / ratings.len() as f64;
    Some((avg * 10.0).round() / 10.0)
}

impl App {
    pub fn reviews(&self, restaurant_id: &str) -> Vec<Review> {
        let real = self.store.reviews(restaurant_id).unwrap_or_else(|err| {
            log::error!("error fetching reviews: {err}");
            Vec::new()
        });

        distribute(real, restaurant_id)
    }

    /// Stores a review and refreshes the restaurant's rating summary.
    pub fn add_review(&self, review: NewReview) -> Result<Review, AppError> {
        if !(1..=5).contains(&review.rating) {
            return Err(AppError::invalid_input(format!(
                "rating must be between 1 and 5, got {}",
                review.rating
            )));
        }

        let created = self.store.insert_review(&review)?;

        match self.store.review_ratings(&review.restaurant_id) {
            Ok(ratings) => {
                if let Some(avg) = average_rating(&ratings) {
                    if let Err(err) =
                        self.store
                            .update_rating(&review.restaurant_id, avg, ratings.len() as u64)
                    {
                        log::error!("failed to update rating of {}: {err}", review.restaurant_id);
                    }
                }
            }
            Err(err) => log::error!("failed to read ratings of {}: {err}", review.restaurant_id),
        }

        Ok(created)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, rating: u8) -> Review {
        Review {
            id: id.to_string(),
            restaurant_id: "r1".to_string(),
            rating,
            ..Default::default()
        }
    }

    #[test]
    fn test_distribute_without_reviews() {
        let reviews = distribute(Vec::new(), "r1");
        let ratings: Vec<u8> = reviews.iter().map(|r| r.rating).collect();
        assert_eq!(ratings, vec![5, 5, 5, 3, 1]);
        assert!(reviews.iter().all(|r| r.id.starts_with("mock-rev-")));
        assert_eq!(
            reviews[1].user.as_ref().unwrap().avatar_url.as_deref(),
            Some("https://i.pravatar.cc/150?img=11")
        );
        assert_eq!(reviews[4].user_id, "mock-user-1");
    }

    #[test]
    fn test_distribute_prefers_real() {
        let real = vec![
            review("a", 4),
            review("b", 2),
            review("c", 5),
            review("d", 3),
            review("e", 1),
            review("f", 3),
        ];
        let reviews = distribute(real, "r1");
        let ids: Vec<&str> = reviews.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(&ids[..2], &["a", "c"]);
        assert!(ids[2].starts_with("mock-rev-5-"));
        assert_eq!(&ids[3..], &["d", "b"]);
    }

    #[test]
    fn test_average_rating() {
        assert_eq!(average_rating(&[]), None);
        assert_eq!(average_rating(&[5, 4, 4]), Some(4.3));
        assert_eq!(average_rating(&[1]), Some(1.0));
    }
}
