use crate::board_server::BoardServer;
use crate::config::Config;
use crate::db::MongoDB;
use crate::task_service::TaskService;
use crate::task_store::MongoTaskStore;
use crate::user_directory::UserDirectory;
use actix::Addr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub board_server: Addr<BoardServer>,
    pub mongodb: Arc<MongoDB>,
    pub tasks: TaskService<MongoTaskStore>,
    pub users: UserDirectory,
    pub config: Config,
}
