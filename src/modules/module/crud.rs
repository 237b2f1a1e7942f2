use crate::modules::module::model::Module;
use bson::{doc, Document};
use mongodb::{Collection, Database};

pub const COLLECTION_NAME: &str = "modules";

pub struct ModuleCrud {
    collection: Collection<Module>,
}

impl ModuleCrud {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
        }
    }

    pub async fn create(&self, module: &Module) -> Result<(), mongodb::error::Error> {
        self.collection.insert_one(module).await?;
        Ok(())
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<Module>, mongodb::error::Error> {
        use futures::TryStreamExt;

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "order": 1, "title": 1 })
            .await?;

        cursor.try_collect().await
    }

    pub async fn find_by_course(&self, course_ref: &str) -> Result<Vec<Module>, mongodb::error::Error> {
        self.find(doc! { "course_id": course_ref }).await
    }

    pub async fn count(&self, filter: Document) -> Result<u64, mongodb::error::Error> {
        self.collection.count_documents(filter).await
    }
}
