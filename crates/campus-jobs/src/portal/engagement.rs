use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::context::{signed_in, PortalContext};
use super::domain::{Actor, Job, JobId, Review, ReviewId, UserId};
use super::errors::{Missing, PortalError, Resource};
use super::pagination::{Page, PageRequest};
use super::repository::{NewReview, PortalStore, RepositoryError};
use super::resource::ResourceService;

const RATING_RANGE: std::ops::RangeInclusive<u8> = 1..=5;

/// A review as shown to clients; anonymous reviews hide the reviewer from
/// everyone but the reviewer and administrators.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReviewView {
    pub id: ReviewId,
    pub job_id: JobId,
    pub reviewer_id: Option<UserId>,
    pub rating: u8,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub is_anonymous: bool,
}

impl ReviewView {
    pub fn for_viewer(review: Review, viewer: Option<&Actor>) -> Self {
        let reveal = !review.is_anonymous
            || viewer.is_some_and(|actor| actor.is_admin() || actor.id == review.reviewer_id);
        Self {
            id: review.id,
            job_id: review.job_id,
            reviewer_id: reveal.then_some(review.reviewer_id),
            rating: review.rating,
            comment: review.comment,
            created_at: review.created_at,
            is_anonymous: review.is_anonymous,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobReviews {
    pub job_id: JobId,
    pub count: usize,
    pub average_rating: Option<f64>,
    pub reviews: Vec<ReviewView>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReviewDraft {
    pub job: JobId,
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub is_anonymous: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewPatch {
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReviewFilter {
    #[serde(default)]
    pub job: Option<JobId>,
}

fn check_rating(rating: u8) -> Result<(), PortalError> {
    if RATING_RANGE.contains(&rating) {
        Ok(())
    } else {
        Err(PortalError::field(
            "rating",
            "rating must be between 1 and 5",
            rating,
            &["Use a whole number from 1 to 5"],
        ))
    }
}

pub struct ReviewService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> ReviewService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    fn review(&self, id: ReviewId) -> Result<Review, PortalError> {
        self.ctx
            .store
            .fetch_review(id)?
            .ok_or(PortalError::NotFound(Missing::Review(id)))
    }

    fn written_by(&self, actor: &Actor, id: ReviewId) -> Result<Review, PortalError> {
        let review = self.review(id)?;
        if review.reviewer_id != actor.id {
            return Err(PortalError::permission("only the author can change a review"));
        }
        Ok(review)
    }

    /// Public summary of a job's reviews, newest first.
    pub fn for_job(&self, viewer: Option<&Actor>, job: JobId) -> Result<JobReviews, PortalError> {
        let job = self.ctx.job(job)?;
        let mut reviews = self.ctx.store.reviews_for_job(job.id)?;
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let count = reviews.len();
        let average_rating = (count > 0).then(|| {
            reviews.iter().map(|r| f64::from(r.rating)).sum::<f64>() / count as f64
        });
        Ok(JobReviews {
            job_id: job.id,
            count,
            average_rating,
            reviews: reviews
                .into_iter()
                .map(|review| ReviewView::for_viewer(review, viewer))
                .collect(),
        })
    }
}

impl<S: PortalStore + 'static> ResourceService for ReviewService<S> {
    type Id = ReviewId;
    type Item = ReviewView;
    type Create = ReviewDraft;
    type Update = ReviewPatch;
    type Filter = ReviewFilter;

    const RESOURCE: Resource = Resource::Reviews;

    /// Reviews the actor wrote or received on their own jobs.
    fn list(
        &self,
        actor: Option<&Actor>,
        filter: ReviewFilter,
        page: PageRequest,
    ) -> Result<Page<ReviewView>, PortalError> {
        let actor = signed_in(actor)?;
        let own_jobs: Vec<JobId> = self
            .ctx
            .store
            .list_jobs()?
            .into_iter()
            .filter(|job| job.employer_id == actor.id)
            .map(|job| job.id)
            .collect();
        let mut reviews: Vec<Review> = self
            .ctx
            .store
            .list_reviews()?
            .into_iter()
            .filter(|r| {
                actor.is_admin() || r.reviewer_id == actor.id || own_jobs.contains(&r.job_id)
            })
            .filter(|r| filter.job.map_or(true, |job| r.job_id == job))
            .collect();
        reviews.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(Page::paginate(reviews, page, self.ctx.settings.page_size)
            .map(|review| ReviewView::for_viewer(review, Some(actor))))
    }

    fn retrieve(&self, actor: Option<&Actor>, id: ReviewId) -> Result<ReviewView, PortalError> {
        Ok(ReviewView::for_viewer(self.review(id)?, actor))
    }

    fn create(&self, actor: Option<&Actor>, input: ReviewDraft) -> Result<ReviewView, PortalError> {
        let actor = signed_in(actor)?;
        let job = self.ctx.job(input.job)?;
        if job.employer_id == actor.id {
            return Err(PortalError::permission("you cannot review your own job"));
        }
        check_rating(input.rating)?;

        let review = self
            .ctx
            .store
            .insert_review(NewReview {
                job_id: job.id,
                reviewer_id: actor.id,
                rating: input.rating,
                comment: input.comment,
                is_anonymous: input.is_anonymous,
                created_at: self.ctx.now(),
            })
            .map_err(|err| match err {
                RepositoryError::Conflict(_) => PortalError::review_exists(),
                other => other.into(),
            })?;
        tracing::info!(review = %review.id, job = %job.id, "review posted");
        Ok(ReviewView::for_viewer(review, Some(actor)))
    }

    fn update(
        &self,
        actor: Option<&Actor>,
        id: ReviewId,
        input: ReviewPatch,
    ) -> Result<ReviewView, PortalError> {
        let actor = signed_in(actor)?;
        let mut review = self.written_by(actor, id)?;
        if let Some(rating) = input.rating {
            check_rating(rating)?;
            review.rating = rating;
        }
        if let Some(comment) = input.comment {
            review.comment = comment;
        }
        if let Some(anonymous) = input.is_anonymous {
            review.is_anonymous = anonymous;
        }
        self.ctx.store.update_review(review.clone())?;
        Ok(ReviewView::for_viewer(review, Some(actor)))
    }

    fn destroy(&self, actor: Option<&Actor>, id: ReviewId) -> Result<(), PortalError> {
        let review = self.written_by(signed_in(actor)?, id)?;
        self.ctx.store.delete_review(review.id)?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FavoriteState {
    pub job_id: JobId,
    pub favorited: bool,
}

pub struct FavoriteService<S> {
    ctx: PortalContext<S>,
}

impl<S: PortalStore> FavoriteService<S> {
    pub fn new(ctx: PortalContext<S>) -> Self {
        Self { ctx }
    }

    /// Add the job to the actor's favorites, or remove it if already there.
    pub fn toggle(&self, actor: &Actor, job: JobId) -> Result<FavoriteState, PortalError> {
        let job = self.ctx.job(job)?;
        let store = &self.ctx.store;
        let favorited = if store.delete_favorite(actor.id, job.id)? {
            false
        } else {
            match store.insert_favorite(actor.id, job.id, self.ctx.now()) {
                Ok(_) | Err(RepositoryError::Conflict(_)) => true,
                Err(other) => return Err(other.into()),
            }
        };
        tracing::debug!(user = %actor.id, job = %job.id, favorited, "favorite toggled");
        Ok(FavoriteState {
            job_id: job.id,
            favorited,
        })
    }

    /// Favorite jobs, most recently added first.
    pub fn jobs(&self, actor: &Actor) -> Result<Vec<Job>, PortalError> {
        let mut favorites = self.ctx.store.favorites_for_user(actor.id)?;
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        let mut jobs = Vec::with_capacity(favorites.len());
        for favorite in favorites {
            if let Some(job) = self.ctx.store.fetch_job(favorite.job_id)? {
                jobs.push(job);
            }
        }
        Ok(jobs)
    }
}
