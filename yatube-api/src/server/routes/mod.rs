use crate::server::ServerRouter;

mod comments;
mod follows;
mod groups;
mod posts;
mod users;

pub fn routes() -> ServerRouter {
    ServerRouter::new()
        .merge(posts::routes())
        .merge(comments::routes())
        .merge(groups::routes())
        .merge(follows::routes())
        .merge(users::routes())
}
