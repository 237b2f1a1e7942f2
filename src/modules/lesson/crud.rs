use crate::modules::lesson::model::Lesson;
use bson::{doc, Document};
use mongodb::{Collection, Database};

pub const COLLECTION_NAME: &str = "lessons";

pub struct LessonCrud {
    collection: Collection<Lesson>,
}

impl LessonCrud {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
        }
    }

    pub async fn create_many(&self, lessons: &[Lesson]) -> Result<usize, mongodb::error::Error> {
        if lessons.is_empty() {
            return Ok(0);
        }
        let result = self.collection.insert_many(lessons).await?;
        Ok(result.inserted_ids.len())
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<Lesson>, mongodb::error::Error> {
        use futures::TryStreamExt;

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "order": 1 })
            .await?;

        cursor.try_collect().await
    }

    pub async fn count(&self, filter: Document) -> Result<u64, mongodb::error::Error> {
        self.collection.count_documents(filter).await
    }
}
