//! # User API
//!
//! The six CRUD handlers for the `User` entity and the hooks they carry:
//!
//! | Action | Hooks |
//! |--------|-------|
//! | index | normalize email |
//! | show, count | none beyond the defaults |
//! | create | normalize email, require name/email/password, default role on `save` |
//! | update | normalize email, owner-or-admin on `query`, protect role on `save` |
//! | destroy | owner-or-admin on `query` |

pub mod hooks;

use hooks::{default_role, protect_role, validate_signup, NormalizeEmail, RequireOwnerOrAdmin};
use resource_framework::{ConfigurationError, Handler, ResourceFactory, Stage};

pub const ENTITY: &str = "User";

/// Builds every `User` handler, in route registration order.
pub fn handlers(factory: &ResourceFactory) -> Result<Vec<Handler>, ConfigurationError> {
    let users = factory.resource(ENTITY);

    let mut create = users.create();
    create
        .sanitize_hook(NormalizeEmail)?
        .on_validate(validate_signup)?
        .pre(Stage::Save, default_role)?;

    let mut update = users.update();
    update
        .sanitize_hook(NormalizeEmail)?
        .pre_hook(Stage::Query, RequireOwnerOrAdmin)?
        .pre(Stage::Save, protect_role)?;

    let mut destroy = users.destroy();
    destroy.pre_hook(Stage::Query, RequireOwnerOrAdmin)?;

    let mut index = users.index();
    index.sanitize_hook(NormalizeEmail)?;

    // Count is mounted before show so `/users/count` is not read as an id.
    Ok(vec![
        users.count().to_handler(),
        index.to_handler(),
        create.to_handler(),
        users.show().to_handler(),
        update.to_handler(),
        destroy.to_handler(),
    ])
}
