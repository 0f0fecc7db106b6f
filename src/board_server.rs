// src/board_server.rs

use std::collections::{HashMap, HashSet};

use actix::prelude::*;
use log::info;
use serde_json::json;

/// Outbound text frame for one websocket session.
#[derive(Message)]
#[rtype(result = "()")]
pub struct BoardMessage(pub String);

#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect {
    pub user_id: String,
    pub addr: Recipient<BoardMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct Disconnect {
    pub user_id: String,
    pub addr: Recipient<BoardMessage>,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct JoinTask {
    pub user_id: String,
    pub task_id: String,
}

#[derive(Message)]
#[rtype(result = "()")]
pub struct LeaveTask {
    pub user_id: String,
    pub task_id: String,
}

/// Sent by the HTTP handlers after a mutation lands, so watchers of the
/// task can refetch.
#[derive(Message)]
#[rtype(result = "()")]
pub struct TaskChanged {
    pub task_id: String,
    pub action: &'static str,
}

/// Tracks which users are connected and which tasks each is watching.
/// Sessions support multiple connections per user.
#[derive(Default)]
pub struct BoardServer {
    sessions: HashMap<String, Vec<Recipient<BoardMessage>>>,
    watchers: HashMap<String, HashSet<String>>,
}

impl BoardServer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Actor for BoardServer {
    type Context = Context<Self>;
}

impl Handler<Connect> for BoardServer {
    type Result = ();

    fn handle(&mut self, msg: Connect, _: &mut Context<Self>) {
        info!("User {} connected (WS)", msg.user_id);
        self.sessions
            .entry(msg.user_id.clone())
            .or_default()
            .push(msg.addr);
    }
}

impl Handler<Disconnect> for BoardServer {
    type Result = ();

    fn handle(&mut self, msg: Disconnect, _: &mut Context<Self>) {
        info!("User {} disconnected (WS)", msg.user_id);
        if let Some(addrs) = self.sessions.get_mut(&msg.user_id) {
            // Remove only the connection that matches the provided address.
            addrs.retain(|a| a != &msg.addr);
            if addrs.is_empty() {
                self.sessions.remove(&msg.user_id);
                // No live session left: stop watching everything.
                for watchers in self.watchers.values_mut() {
                    watchers.remove(&msg.user_id);
                }
                self.watchers.retain(|_, watchers| !watchers.is_empty());
            }
        }
    }
}

impl Handler<JoinTask> for BoardServer {
    type Result = ();

    fn handle(&mut self, msg: JoinTask, _: &mut Context<Self>) {
        self.watchers
            .entry(msg.task_id)
            .or_default()
            .insert(msg.user_id);
    }
}

impl Handler<LeaveTask> for BoardServer {
    type Result = ();

    fn handle(&mut self, msg: LeaveTask, _: &mut Context<Self>) {
        if let Some(watchers) = self.watchers.get_mut(&msg.task_id) {
            watchers.remove(&msg.user_id);
            if watchers.is_empty() {
                self.watchers.remove(&msg.task_id);
            }
        }
    }
}

impl Handler<TaskChanged> for BoardServer {
    type Result = ();

    fn handle(&mut self, msg: TaskChanged, _: &mut Context<Self>) {
        let Some(watchers) = self.watchers.get(&msg.task_id) else {
            return;
        };
        let payload = json!({
            "event": "task-changed",
            "taskId": msg.task_id,
            "action": msg.action,
        })
        .to_string();
        for user_id in watchers {
            if let Some(addrs) = self.sessions.get(user_id) {
                // Send to all active connections for that user.
                for addr in addrs {
                    addr.do_send(BoardMessage(payload.clone()));
                }
            }
        }
        if msg.action == "deleted" {
            self.watchers.remove(&msg.task_id);
        }
    }
}
