use crate::modules::progress::model::Progress;
use bson::Document;
use mongodb::{Collection, Database};

pub const COLLECTION_NAME: &str = "progress";
pub const CERTIFICATES: &str = "certificates";

pub struct ProgressCrud {
    collection: Collection<Progress>,
    certificates: Collection<Document>,
}

impl ProgressCrud {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
            certificates: db.collection(CERTIFICATES),
        }
    }

    pub async fn create(&self, progress: &Progress) -> Result<(), mongodb::error::Error> {
        self.collection.insert_one(progress).await?;
        Ok(())
    }

    pub async fn count(&self, filter: Document) -> Result<u64, mongodb::error::Error> {
        self.collection.count_documents(filter).await
    }

    pub async fn count_certificates(&self, filter: Document) -> Result<u64, mongodb::error::Error> {
        self.certificates.count_documents(filter).await
    }
}
