//! Place workflow: create, update and delete places across the
//! geocoder, the image store and the record repository.
//!
//! Steps always run in the same order: validate, resolve, upload,
//! persist. Every side effect outside the database is paired with an
//! undo step in a [`CompensationLog`], which is unwound when a later
//! step fails.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use super::compensation::{discard_image, Compensation, CompensationLog};
use crate::application::ports::{AddressResolver, ImageStore, ImageUpload};
use crate::domain::{
    DocumentWrite, DomainError, DomainResult, Place, RepositoryProvider,
};
use crate::shared::{with_timeout, CallTimeouts};

/// Input for [`PlaceWorkflow::create`]. Fields are already validated.
#[derive(Debug, Clone)]
pub struct NewPlace {
    pub title: String,
    pub description: String,
    pub address: String,
    pub image: ImageUpload,
}

/// Input for [`PlaceWorkflow::update`].
#[derive(Debug, Clone)]
pub struct PlaceChanges {
    pub title: String,
    pub description: String,
}

pub struct PlaceWorkflow {
    repos: Arc<dyn RepositoryProvider>,
    resolver: Arc<dyn AddressResolver>,
    images: Arc<dyn ImageStore>,
    timeouts: CallTimeouts,
}

impl PlaceWorkflow {
    pub fn new(
        repos: Arc<dyn RepositoryProvider>,
        resolver: Arc<dyn AddressResolver>,
        images: Arc<dyn ImageStore>,
        timeouts: CallTimeouts,
    ) -> Self {
        Self {
            repos,
            resolver,
            images,
            timeouts,
        }
    }

    // ── Commands ────────────────────────────────────────────────

    /// Create a place owned by `requester_id`.
    #[instrument(skip(self, new_place), fields(address = %new_place.address))]
    pub async fn create(&self, requester_id: &str, new_place: NewPlace) -> DomainResult<Place> {
        let result = self.run_create(requester_id, new_place).await;
        record_outcome("create", &result);
        result
    }

    async fn run_create(&self, requester_id: &str, new_place: NewPlace) -> DomainResult<Place> {
        let NewPlace {
            title,
            description,
            address,
            image,
        } = new_place;

        let creator = self
            .db("find user", self.repos.records().find_user(requester_id))
            .await?
            .ok_or_else(|| DomainError::not_found("User", requester_id))?;

        let location = with_timeout(
            self.timeouts.geocoder,
            "geocode",
            self.resolver.resolve(&address),
            DomainError::Geocode,
        )
        .await?;

        let stored = with_timeout(
            self.timeouts.storage,
            "image upload",
            self.images.upload(image),
            DomainError::Storage,
        )
        .await?;

        let mut compensation = CompensationLog::new(self.images.clone(), self.timeouts.storage);
        compensation.record(Compensation::DeleteImage {
            key: stored.key.clone(),
        });

        let place = Place::new(title, description, address, location, Some(stored), &creator.id);
        let writes = vec![
            DocumentWrite::UpsertPlace(place.clone()),
            DocumentWrite::PushPlaceRef {
                user_id: creator.id.clone(),
                place_id: place.id.clone(),
            },
        ];

        if let Err(e) = self
            .db("save place", self.repos.records().save_atomically(writes))
            .await
        {
            match self.commit_outcome(&place.id).await {
                CommitOutcome::Applied => {
                    warn!(place_id = %place.id, error = %e, "Commit reported failure but the place was stored");
                }
                CommitOutcome::Absent => {
                    compensation.unwind().await;
                    return Err(commit_error(e));
                }
                CommitOutcome::Unknown => {
                    warn!(place_id = %place.id, "Commit outcome unknown; keeping the uploaded image");
                    compensation.complete();
                    return Err(commit_error(e));
                }
            }
        }
        compensation.complete();

        info!(place_id = %place.id, creator_id = %creator.id, "Place created");
        Ok(place)
    }

    /// Replace title and description of a place the requester owns.
    #[instrument(skip(self, changes))]
    pub async fn update(
        &self,
        requester_id: &str,
        place_id: &str,
        changes: PlaceChanges,
    ) -> DomainResult<Place> {
        let result = self.run_update(requester_id, place_id, changes).await;
        record_outcome("update", &result);
        result
    }

    async fn run_update(
        &self,
        requester_id: &str,
        place_id: &str,
        changes: PlaceChanges,
    ) -> DomainResult<Place> {
        let mut place = self
            .db("find place", self.repos.places().find_by_id(place_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Place", place_id))?;

        if !place.is_owned_by(requester_id) {
            return Err(DomainError::Forbidden(
                "You are not allowed to edit this place.".into(),
            ));
        }

        place.rewrite(changes.title, changes.description);
        self.db("update place", self.repos.places().update(&place))
            .await
            .map_err(commit_error)?;

        info!(place_id, "Place updated");
        Ok(place)
    }

    /// Delete a place the requester owns, then drop its image.
    #[instrument(skip(self))]
    pub async fn delete(&self, requester_id: &str, place_id: &str) -> DomainResult<()> {
        let result = self.run_delete(requester_id, place_id).await;
        record_outcome("delete", &result);
        result
    }

    async fn run_delete(&self, requester_id: &str, place_id: &str) -> DomainResult<()> {
        let (place, creator) = self
            .db(
                "find place",
                self.repos.records().find_place_with_creator(place_id),
            )
            .await?
            .ok_or_else(|| DomainError::not_found("Place", place_id))?;

        if creator.id != requester_id {
            return Err(DomainError::Forbidden(
                "You are not allowed to delete this place.".into(),
            ));
        }

        let writes = vec![DocumentWrite::PullPlaceRef {
            user_id: creator.id.clone(),
            place_id: place.id.clone(),
        }];
        self.db(
            "remove place",
            self.repos.records().remove_atomically(&place, writes),
        )
        .await
        .map_err(commit_error)?;

        if let Some(image) = &place.image {
            discard_image(
                self.images.as_ref(),
                &image.key,
                self.timeouts.storage,
                "image_cleanup",
            )
            .await;
        }

        info!(place_id, "Place deleted");
        Ok(())
    }

    // ── Queries ─────────────────────────────────────────────────

    pub async fn list_places(&self) -> DomainResult<Vec<Place>> {
        self.db("list places", self.repos.places().list_all()).await
    }

    pub async fn get_place(&self, place_id: &str) -> DomainResult<Place> {
        self.db("find place", self.repos.places().find_by_id(place_id))
            .await?
            .ok_or_else(|| DomainError::not_found("Place", place_id))
    }

    /// Places created by `user_id`. An existing user without places
    /// yields an empty list.
    pub async fn places_for_user(&self, user_id: &str) -> DomainResult<Vec<Place>> {
        let found = self
            .db(
                "find user places",
                self.repos.records().find_user_with_places(user_id),
            )
            .await?
            .ok_or_else(|| DomainError::not_found("User", user_id))?;
        Ok(found.places)
    }

    /// A commit that errored or timed out may still have been applied.
    /// Read the place back before undoing the upload.
    async fn commit_outcome(&self, place_id: &str) -> CommitOutcome {
        match self
            .db("verify place", self.repos.records().find_place(place_id))
            .await
        {
            Ok(Some(_)) => CommitOutcome::Applied,
            Ok(None) => CommitOutcome::Absent,
            Err(e) => {
                warn!(place_id, error = %e, "Could not read back place after failed commit");
                CommitOutcome::Unknown
            }
        }
    }

    async fn db<T>(
        &self,
        operation_name: &str,
        operation: impl std::future::Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        with_timeout(
            self.timeouts.database,
            operation_name,
            operation,
            DomainError::Persistence,
        )
        .await
    }
}

enum CommitOutcome {
    Applied,
    Absent,
    Unknown,
}

/// A uniqueness violation during a commit means the write could not be
/// applied; the caller sees it as a persistence failure.
fn commit_error(e: DomainError) -> DomainError {
    match e {
        DomainError::Conflict(msg) => DomainError::Persistence(msg),
        other => other,
    }
}

fn record_outcome<T>(operation: &'static str, result: &DomainResult<T>) {
    let outcome = match result {
        Ok(_) => "ok",
        Err(e) => e.kind(),
    };
    metrics::counter!("place_workflow_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
}
