//! Book collection management.
//!
//! Every successful mutation queues a statistics resync. The queue is
//! fire-and-forget: a resync that cannot be queued or later fails is logged
//! and never fails the write itself.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;

use crate::error::{EngineError, Result};
use crate::model::{Book, BookId, BookPatch, NewBook};
use crate::normalizer::NormalizedText;
use crate::resync::ResyncHandle;
use crate::store::Store;

/// Outcome of appending words to a book
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookAppend {
    pub book: Book,
    /// Words the book did not contain before
    pub added: usize,
}

pub struct BookService<S> {
    store: Arc<S>,
    resync: ResyncHandle,
}

impl<S: Store> BookService<S> {
    pub fn new(store: Arc<S>, resync: ResyncHandle) -> Self {
        Self { store, resync }
    }

    pub async fn book(&self, book_id: BookId) -> Result<Book> {
        self.store
            .book(book_id)
            .await?
            .ok_or(EngineError::BookNotFound(book_id))
    }

    /// All books, sorted by title
    pub async fn books(&self) -> Result<Vec<Book>> {
        let mut books = self.store.books().await?;
        books.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
        Ok(books)
    }

    pub async fn create(&self, new_book: NewBook) -> Result<Book> {
        let book = new_book.into_book(Utc::now());
        self.store.insert_book(book.clone()).await?;

        tracing::info!(
            book_id = %book.id,
            title = %book.title,
            words = book.unique_word_count(),
            "Created book"
        );
        self.resync.notify();
        Ok(book)
    }

    /// Append raw words; repeats add to in-book occurrence counts
    pub async fn append_words(&self, book_id: BookId, words: &[String]) -> Result<BookAppend> {
        let mut book = self.book(book_id).await?;
        let added = book.append_words(words);
        self.save_appended(book, added).await
    }

    /// Append the candidate words of normalized page text
    pub async fn append_normalized(&self, book_id: BookId, text: &NormalizedText) -> Result<BookAppend> {
        let mut book = self.book(book_id).await?;
        let added = book.append_counted(&text.candidate_words, &text.word_frequencies);
        self.save_appended(book, added).await
    }

    async fn save_appended(&self, mut book: Book, added: usize) -> Result<BookAppend> {
        book.updated_at = Utc::now();
        self.store.update_book(book.clone()).await?;

        tracing::debug!(book_id = %book.id, added, total = book.unique_word_count(), "Appended book words");
        self.resync.notify();
        Ok(BookAppend { book, added })
    }

    pub async fn update(&self, book_id: BookId, patch: BookPatch) -> Result<Book> {
        let mut book = self.book(book_id).await?;
        if let Some(title) = patch.title {
            book.title = title;
        }
        if let Some(author) = patch.author {
            book.author = Some(author);
        }
        if let Some(is_beta) = patch.is_beta {
            book.is_beta = is_beta;
        }
        if let Some(approval) = patch.approval {
            book.approval = approval;
        }
        book.updated_at = Utc::now();
        self.store.update_book(book.clone()).await?;

        tracing::debug!(book_id = %book.id, "Updated book");
        self.resync.notify();
        Ok(book)
    }

    pub async fn delete(&self, book_id: BookId) -> Result<Book> {
        let book = self
            .store
            .delete_book(book_id)
            .await?
            .ok_or(EngineError::BookNotFound(book_id))?;

        tracing::info!(book_id = %book.id, title = %book.title, "Deleted book");
        self.resync.notify();
        Ok(book)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ResyncConfig;
    use crate::model::ApprovalStatus;
    use crate::resync::ResyncWorker;
    use crate::store::StatsStore;
    use crate::store::testing::FlakyStats;
    use uuid::Uuid;

    fn service() -> (Arc<FlakyStats>, BookService<FlakyStats>, ResyncHandle) {
        let store = Arc::new(FlakyStats::new());
        let (handle, _task) = ResyncWorker::spawn(store.clone(), ResyncConfig::default());
        (store.clone(), BookService::new(store, handle.clone()), handle)
    }

    fn new_book(title: &str, words: &[&str]) -> NewBook {
        NewBook {
            title: title.to_string(),
            words: words.iter().map(|w| w.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_create_and_append_trigger_resync() {
        let (store, books, handle) = service();

        let book = books.create(new_book("A", &["cat", "Cat", "dog"])).await.unwrap();
        assert_eq!(book.words, vec!["cat", "dog"]);
        assert_eq!(book.occurrences["cat"], 2);
        assert_eq!(book.approval, ApprovalStatus::Pending);

        let appended = books
            .append_words(book.id, &["owl".to_string(), "dog".to_string()])
            .await
            .unwrap();
        assert_eq!(appended.added, 1);
        assert_eq!(appended.book.unique_word_count(), 3);

        handle.wait_for(handle.last_requested()).await.unwrap();
        let stats = store.stats_for(&["cat".to_string(), "dog".to_string()]).await.unwrap();
        assert_eq!(stats["cat"].total_occurrences, 2);
        assert_eq!(stats["dog"].total_occurrences, 2);
        assert_eq!(store.all_stats().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_write_succeeds_when_resync_fails() {
        let (store, books, handle) = service();
        store.set_fail_stats_writes(true);

        let book = books.create(new_book("A", &["cat"])).await.unwrap();
        assert_eq!(books.book(book.id).await.unwrap().title, "A");

        store.set_fail_stats_writes(false);
        handle.flush().await.unwrap();
        assert_eq!(store.all_stats().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let (store, books, handle) = service();
        let book = books.create(new_book("Old", &["sun"])).await.unwrap();

        let patch = BookPatch {
            title: Some("New".to_string()),
            approval: Some(ApprovalStatus::Approved),
            ..Default::default()
        };
        let updated = books.update(book.id, patch).await.unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.approval, ApprovalStatus::Approved);
        assert_eq!(updated.words, vec!["sun"]);

        books.delete(book.id).await.unwrap();
        assert!(matches!(
            books.delete(book.id).await,
            Err(EngineError::BookNotFound(_))
        ));
        handle.flush().await.unwrap();
        assert!(store.all_stats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_book() {
        let (_store, books, _handle) = service();
        let err = books.append_words(Uuid::new_v4(), &[]).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
