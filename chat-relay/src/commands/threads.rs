// Thread Commands
//
// 线程列表、查看、软删除与模型列表

use crate::infrastructure::AppState;
use crate::modules::chat::{ApplicationError, Pagination, ThreadFilter, ThreadId};
use crate::shared::AppResult;

/// 列表默认请求条数（存储总是返回单页）
const DEFAULT_PAGE_SIZE: u32 = 20;

pub async fn list_threads(state: &AppState, search: Option<String>) -> AppResult<()> {
    let filter = ThreadFilter {
        search,
        user_identifier: None,
    };
    let page = state
        .chat
        .list_threads(Pagination::new(DEFAULT_PAGE_SIZE), filter)
        .await?;

    if page.data.is_empty() {
        println!("No threads.");
        return Ok(());
    }

    for thread in &page.data {
        println!(
            "{}\t{}\t{} steps\t{}",
            thread.id(),
            thread.name(),
            thread.steps().len(),
            thread.created_at().format("%Y-%m-%d %H:%M:%S")
        );
    }
    Ok(())
}

pub async fn show_thread(state: &AppState, id: &str) -> AppResult<()> {
    let id = ThreadId::from(id);
    let thread = state
        .chat
        .get_thread(&id)
        .await?
        .ok_or_else(|| ApplicationError::NotFound(id.to_string()))?;
    let author = state.chat.get_thread_author(&id).await?;
    let deleted = state.chat.thread_repository().is_deleted(&id).await?;

    println!(
        "{} ({}) by {}{}",
        thread.name(),
        thread.id(),
        author,
        if deleted { " [deleted]" } else { "" }
    );
    for step in thread.steps() {
        println!("  [{:?}] {}: {}", step.step_type(), step.name(), step.output());
    }
    Ok(())
}

pub async fn delete_thread(state: &AppState, id: &str) -> AppResult<()> {
    let response = state.chat.delete_thread(&ThreadId::from(id)).await?;
    if response.newly_deleted {
        println!("Deleted thread {}", id);
    } else {
        println!("Thread {} was already deleted", id);
    }
    Ok(())
}

pub async fn list_models(state: &AppState) -> AppResult<()> {
    for model in state.chat.list_models().await? {
        println!("{}", model);
    }
    Ok(())
}
