pub type TaskID = usize;

/// A unit of work run repeatedly on its own thread until it returns `false`
/// or is told to stop.
pub trait SteppableTask: Send + 'static {
    fn step(&mut self) -> bool;
}

struct ManagedTask {
    name: String,
    handle: std::thread::JoinHandle<()>,
    stop_sender: crossbeam_channel::Sender<()>,
}

/// Owns the poller, scope and renderer threads.
pub struct TaskManager {
    next_task_id: TaskID,
    tasks: std::collections::BTreeMap<TaskID, ManagedTask>,
}

impl TaskManager {
    #[must_use]
    pub fn new() -> Self {
        TaskManager {
            next_task_id: 0,
            tasks: std::collections::BTreeMap::new(),
        }
    }

    /// Starts `task` on a new thread named `name`, stepping it every `period`
    /// (back to back when `period` is zero).
    ///
    /// # Panics
    ///
    /// Will panic if the thread cannot be spawned.
    pub fn add_task<T>(&mut self, name: &str, task: T, period: std::time::Duration) -> TaskID
    where
        T: SteppableTask,
    {
        let id = self.next_task_id;
        let (stop_sender, stop_receiver) = crossbeam_channel::bounded::<()>(1);

        let handle = std::thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                if period.is_zero() {
                    run_task_continuously(task, &stop_receiver);
                } else {
                    run_task_with_period(task, period, &stop_receiver);
                }
            })
            .expect("Failed to spawn thread");
        log::debug!("TaskManager: started {name} as task {id}");

        self.tasks.insert(
            id,
            ManagedTask {
                name: name.to_string(),
                handle,
                stop_sender,
            },
        );
        self.next_task_id += 1;
        id
    }

    pub fn stop_all_tasks(&self) {
        log::info!("TaskManager: Signaling all tasks to stop...");
        for task in self.tasks.values() {
            let _ = task.stop_sender.try_send(());
        }
    }

    pub fn wait_on_task_finish(&mut self, task_id: TaskID) {
        if let Some(task) = self.tasks.remove(&task_id) {
            if task.handle.join().is_err() {
                log::error!("TaskManager: task {} panicked", task.name);
            }
        }
    }

    pub fn wait_on_all_tasks(&mut self) {
        let ids: Vec<TaskID> = self.tasks.keys().copied().collect();
        for id in ids {
            self.wait_on_task_finish(id);
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        TaskManager::new()
    }
}

fn should_stop(stop_receiver: &crossbeam_channel::Receiver<()>) -> bool {
    match stop_receiver.try_recv() {
        Ok(()) | Err(crossbeam_channel::TryRecvError::Disconnected) => true,
        Err(crossbeam_channel::TryRecvError::Empty) => false,
    }
}

fn run_task_continuously<T: SteppableTask>(
    mut task: T,
    stop_receiver: &crossbeam_channel::Receiver<()>,
) {
    while !should_stop(stop_receiver) && task.step() {
        std::thread::yield_now();
    }
}

fn run_task_with_period<T: SteppableTask>(
    mut task: T,
    period: std::time::Duration,
    stop_receiver: &crossbeam_channel::Receiver<()>,
) {
    let mut next_run = std::time::Instant::now();
    loop {
        if !task.step() {
            break;
        }

        next_run += period;
        let now = std::time::Instant::now();
        if next_run > now {
            match stop_receiver.recv_timeout(next_run - now) {
                Ok(()) | Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            }
        } else {
            // lagging: restart the schedule from now
            log::debug!("Task overran its period by {:?}", now - next_run);
            next_run = now;
            if should_stop(stop_receiver) {
                break;
            }
        }
    }
}
