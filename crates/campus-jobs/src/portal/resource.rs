use std::fmt::Display;

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::domain::Actor;
use super::errors::{PortalError, Resource};
use super::pagination::{Page, PageRequest};

/// Uniform list/retrieve/create/update/destroy contract behind every REST
/// collection. The actor is resolved once per request and passed explicitly;
/// `None` means an anonymous caller.
pub trait ResourceService: Send + Sync + 'static {
    type Id: DeserializeOwned + Display + Copy + Send + 'static;
    type Item: Serialize + Send + 'static;
    type Create: DeserializeOwned + Send + 'static;
    /// Merge patch; PUT and PATCH share it.
    type Update: DeserializeOwned + Send + 'static;
    type Filter: DeserializeOwned + Default + Send + 'static;

    const RESOURCE: Resource;

    fn list(
        &self,
        actor: Option<&Actor>,
        filter: Self::Filter,
        page: PageRequest,
    ) -> Result<Page<Self::Item>, PortalError>;

    fn retrieve(&self, actor: Option<&Actor>, id: Self::Id) -> Result<Self::Item, PortalError>;

    fn create(&self, actor: Option<&Actor>, input: Self::Create)
        -> Result<Self::Item, PortalError>;

    fn update(
        &self,
        actor: Option<&Actor>,
        id: Self::Id,
        input: Self::Update,
    ) -> Result<Self::Item, PortalError>;

    fn destroy(&self, actor: Option<&Actor>, id: Self::Id) -> Result<(), PortalError>;
}
