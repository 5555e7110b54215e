use serde::{Deserialize, Serialize};

/// Documents addressable by their CMS identifier.
pub trait Identified {
    fn id(&self) -> &str;
}

/// A CMS relationship field.
///
/// Depending on the query depth the CMS either returns the bare identifier or
/// inlines the related document. Both shapes decode into this type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Doc(Box<T>),
}

impl<T: Identified> Ref<T> {
    pub fn id(&self) -> &str {
        match self {
            Ref::Id(id) => id,
            Ref::Doc(doc) => doc.id(),
        }
    }

    /// The inlined document, if the CMS populated it.
    pub fn doc(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Doc(doc) => Some(doc),
        }
    }
}

impl<T> From<T> for Ref<T> {
    fn from(doc: T) -> Self {
        Ref::Doc(Box::new(doc))
    }
}
