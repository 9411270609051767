use std::fmt::{Debug, Display};
use std::future::Future;

use kernel::UploadRecord;

/// Persistent, ordered sequence of upload records.
pub trait Storage: Sync {
    type Err: Debug + Display + Send;

    /// Prepares the backing store. An empty store becomes an empty sequence,
    /// existing content is kept as is.
    fn initialize(&self) -> impl Future<Output = Result<(), Self::Err>> + Send;

    fn load_all(&self) -> impl Future<Output = Result<Vec<UploadRecord>, Self::Err>> + Send;

    fn append(&mut self, record: UploadRecord) -> impl Future<Output = Result<(), Self::Err>> + Send;

    /// Removes the first record matching both keys exactly and returns it.
    fn remove(
        &mut self,
        file: &str,
        name: &str,
    ) -> impl Future<Output = Result<UploadRecord, Self::Err>> + Send;

    fn find(
        &self,
        file: &str,
        name: &str,
    ) -> impl Future<Output = Result<Option<UploadRecord>, Self::Err>> + Send {
        async move {
            Ok(self
                .load_all()
                .await?
                .into_iter()
                .find(|r| r.file == file && r.name == name))
        }
    }
}
