use crate::modules::user::model::User;
use bson::{doc, Document};
use mongodb::{Collection, Database};

pub const COLLECTION_NAME: &str = "users";

pub struct UserCrud {
    collection: Collection<User>,
}

impl UserCrud {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection(COLLECTION_NAME),
        }
    }

    pub async fn find(&self, filter: Document) -> Result<Vec<User>, mongodb::error::Error> {
        use futures::TryStreamExt;

        let cursor = self
            .collection
            .find(filter)
            .sort(doc! { "email": 1 })
            .await?;

        cursor.try_collect().await
    }
}
