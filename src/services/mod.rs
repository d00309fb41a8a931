// Application services: each holds an Arc<Database> plus whatever external
// collaborators its flows touch. GraphQL resolvers and REST handlers stay
// thin and delegate here.

pub mod communities;
pub mod notifications;
pub mod posts;
pub mod sessions;
pub mod studio;
pub mod users;
