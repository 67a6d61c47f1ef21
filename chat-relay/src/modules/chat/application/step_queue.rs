// Step Queue
//
// 步骤记录的两阶段提交：步骤立即被接收（计数），但只有在同一轮的用户消息
// 出现之后才会写入仓储。用户消息总是先于它触发的其它步骤落盘。

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::ApplicationError;
use crate::modules::chat::domain::{
    PersistedUser, Step, StepId, StepType, Thread, ThreadId, ThreadMetadata,
};
use crate::modules::chat::ports::{RepositoryError, ThreadRepository};

/// 自动创建的线程名称最大长度（字符）
const THREAD_NAME_MAX_CHARS: usize = 50;

/// 单个线程的排队状态
#[derive(Debug, Default)]
struct TurnBuffer {
    /// 当前轮的用户消息已提交
    open: bool,
    /// 等待用户消息的步骤，按到达顺序
    pending: Vec<Step>,
}

/// 两阶段步骤队列
///
/// - 阶段一：`record` 接收步骤并计数；所在线程没有进行中的轮次时先缓存。
/// - 阶段二：该线程的用户消息到达后，先写入用户消息，再按到达顺序写入缓存的步骤。
///
/// 助手消息提交后该轮结束，之后的非用户步骤重新进入缓存。
pub struct StepQueue {
    thread_repository: Arc<dyn ThreadRepository>,
    owner: PersistedUser,
    buffers: Mutex<HashMap<ThreadId, TurnBuffer>>,
    ingested: AtomicU64,
    committed: AtomicU64,
}

impl StepQueue {
    /// `owner` 为按需创建的线程的所有者
    pub fn new(thread_repository: Arc<dyn ThreadRepository>, owner: PersistedUser) -> Self {
        Self {
            thread_repository,
            owner,
            buffers: Mutex::new(HashMap::new()),
            ingested: AtomicU64::new(0),
            committed: AtomicU64::new(0),
        }
    }

    /// 接收一个步骤，返回本次调用中写入仓储的步骤 ID（按写入顺序）
    ///
    /// 用户消息写入失败时，该线程的缓存与轮次状态保持不变。
    pub async fn record(&self, step: Step) -> Result<Vec<StepId>, ApplicationError> {
        self.ingested.fetch_add(1, Ordering::SeqCst);

        // 持有锁直到写入完成，保证同一线程的提交顺序
        let mut buffers = self.buffers.lock().await;
        let thread_id = step.thread_id().clone();
        let buffer = buffers.entry(thread_id.clone()).or_default();

        match step.step_type() {
            StepType::UserMessage => {
                let mut committed = vec![self.commit(step).await?];
                buffer.open = true;
                let pending = std::mem::take(&mut buffer.pending);
                self.flush(buffer, pending, &mut committed).await?;
                Ok(committed)
            }
            step_type if buffer.open => {
                let committed = vec![self.commit(step).await?];
                if step_type == StepType::AssistantMessage {
                    buffer.open = false;
                }
                Ok(committed)
            }
            _ => {
                debug!(
                    "Queued step {} until a user message arrives in thread {}",
                    step.id(),
                    thread_id
                );
                buffer.pending.push(step);
                Ok(Vec::new())
            }
        }
    }

    /// 按到达顺序写入缓存的步骤
    ///
    /// 某一步写入失败时，未写入的步骤退回缓存并关闭本轮，等待下一条用户消息。
    /// 重复 ID 的步骤不会再被接受，直接丢弃。
    async fn flush(
        &self,
        buffer: &mut TurnBuffer,
        pending: Vec<Step>,
        committed: &mut Vec<StepId>,
    ) -> Result<(), ApplicationError> {
        let mut steps = pending.into_iter();
        while let Some(step) = steps.next() {
            let step_type = step.step_type();
            match self.commit(step.clone()).await {
                Ok(id) => {
                    committed.push(id);
                    if step_type == StepType::AssistantMessage {
                        buffer.open = false;
                    }
                }
                Err(e) => {
                    let mut rest = Vec::with_capacity(steps.len() + 1);
                    if !matches!(
                        e,
                        ApplicationError::Repository(RepositoryError::Conflict(_))
                    ) {
                        rest.push(step);
                    } else {
                        warn!(
                            "Dropped duplicate step {} in thread {}",
                            step.id(),
                            step.thread_id()
                        );
                    }
                    rest.extend(steps);
                    buffer.pending = rest;
                    buffer.open = false;
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// 已接收的步骤数（包括仍在缓存中的）
    pub fn ingested(&self) -> u64 {
        self.ingested.load(Ordering::SeqCst)
    }

    /// 已写入仓储的步骤数
    pub fn committed(&self) -> u64 {
        self.committed.load(Ordering::SeqCst)
    }

    /// 指定线程中等待用户消息的步骤数
    pub async fn pending(&self, thread_id: &ThreadId) -> usize {
        let buffers = self.buffers.lock().await;
        buffers.get(thread_id).map(|b| b.pending.len()).unwrap_or(0)
    }

    async fn commit(&self, step: Step) -> Result<StepId, ApplicationError> {
        let thread_id = step.thread_id().clone();
        let step_id = step.id().clone();

        if self.thread_repository.is_deleted(&thread_id).await? {
            return Err(ApplicationError::ThreadDeleted(thread_id.to_string()));
        }

        if self.thread_repository.get(&thread_id).await?.is_none() {
            let name: String = match step.step_type() {
                StepType::UserMessage => {
                    step.output().chars().take(THREAD_NAME_MAX_CHARS).collect()
                }
                _ => thread_id.to_string(),
            };
            let thread = Thread::new(
                thread_id.clone(),
                self.owner.clone(),
                ThreadMetadata::named(name),
            );
            self.thread_repository.save(&thread).await?;
            info!("Created thread {} for incoming steps", thread_id);
        }

        self.thread_repository.append_step(&thread_id, step).await?;
        self.committed.fetch_add(1, Ordering::SeqCst);
        debug!("Committed step {} to thread {}", step_id, thread_id);
        Ok(step_id)
    }
}
