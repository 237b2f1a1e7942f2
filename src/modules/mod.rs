use bson::{doc, Bson, Document};

pub mod course;
pub mod lenient;
pub mod lesson;
pub mod module;
pub mod progress;
pub mod quiz;
pub mod user;

/// How a loaded document is addressed in later writes.
///
/// Most documents carry an application `id` string; a few only have `_id`.
pub trait Keyed {
    fn app_id(&self) -> Option<&str>;
    fn object_id(&self) -> Option<&Bson>;

    fn key_filter(&self) -> Document {
        match (self.app_id(), self.object_id()) {
            (Some(id), _) => doc! { "id": id },
            (None, Some(oid)) => doc! { "_id": oid.clone() },
            (None, None) => doc! { "_id": Bson::Null },
        }
    }

    /// The string other documents use to point at this one.
    fn reference(&self) -> Option<String> {
        self.app_id()
            .map(str::to_string)
            .or_else(|| self.object_id().and_then(lenient::bson_to_string))
    }
}
