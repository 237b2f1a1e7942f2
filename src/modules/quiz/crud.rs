use crate::modules::quiz::model::Quiz;
use bson::{doc, Document};
use mongodb::{Collection, Database};

pub const COLLECTION_NAME: &str = "quizzes";

pub struct QuizCrud {
    collection: Collection<Quiz>,
}

impl QuizCrud {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
        }
    }

    pub async fn create(&self, quiz: &Quiz) -> Result<(), mongodb::error::Error> {
        self.collection.insert_one(quiz).await?;
        Ok(())
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<Quiz>, mongodb::error::Error> {
        use futures::TryStreamExt;

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "title": 1 })
            .await?;

        cursor.try_collect().await
    }

    pub async fn count(&self, filter: Document) -> Result<u64, mongodb::error::Error> {
        self.collection.count_documents(filter).await
    }
}
