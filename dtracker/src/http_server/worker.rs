use std::sync::{mpsc::Receiver, Arc, Mutex};
use std::thread::{self, JoinHandle};

use logger::LoggerSender;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub enum Message {
    NewJob(Job),
    Terminate,
}

/// One pool worker: loops pulling jobs off the shared receiver until told
/// to terminate.
pub struct Worker {
    pub id: usize,
    pub thread: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn new(id: usize, receiver: Arc<Mutex<Receiver<Message>>>, logger: LoggerSender) -> Worker {
        let thread = thread::spawn(move || loop {
            let message = receiver
                .lock()
                .expect("thread pool receiver mutex poisoned")
                .recv();

            match message {
                Ok(Message::NewJob(job)) => job(),
                Ok(Message::Terminate) | Err(_) => {
                    logger.info(&format!("Worker {} terminating.", id));
                    break;
                }
            }
        });

        Worker {
            id,
            thread: Some(thread),
        }
    }
}
