pub mod config;
pub mod context;
pub mod controller;
pub mod errors;
pub mod flash;
pub mod inflector;
pub mod models;
pub mod naming;
pub mod pagination;
pub mod routes;
pub mod traits;
pub mod validation;

pub use config::{ControllerConfig, RedirectTarget, RouteSet, Submit};
pub use context::{
    ActionResponse, Actor, RenderDecision, RequestContext, RequestFormat, ResponseContext,
};
pub use controller::{CommitAction, CrudController};
pub use errors::ApiError;
pub use flash::{Flash, FlashKind};
pub use naming::ResourceNaming;
pub use routes::crud_router;
pub use traits::{
    ActionOutcome, AuthorizationTarget, Authorizer, CrudHooks, CrudResource, NoHooks, Params,
    ResourceScope, Templates,
};
pub use validation::{ValidationError, ValidationErrors};
