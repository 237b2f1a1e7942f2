use crate::modules::course::model::Course;
use bson::{doc, Bson, Document};
use mongodb::{Collection, Database};

pub const COLLECTION_NAME: &str = "courses";

pub struct CourseCrud {
    collection: Collection<Course>,
}

impl CourseCrud {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
        }
    }

    pub async fn create(&self, course: &Course) -> Result<Bson, mongodb::error::Error> {
        let result = self.collection.insert_one(course).await?;
        Ok(result.inserted_id)
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<Course>, mongodb::error::Error> {
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

    pub async fn exists_code(&self, code: &str) -> Result<bool, mongodb::error::Error> {
        Ok(self.count(doc! { "code": code }).await? > 0)
    }

    pub async fn categories(&self) -> Result<Vec<String>, mongodb::error::Error> {
        let values = self.collection.distinct("category", doc! {}).await?;
        Ok(values
            .into_iter()
            .filter_map(|v| match v {
                Bson::String(s) => Some(s),
                _ => None,
            })
            .collect())
    }
}
