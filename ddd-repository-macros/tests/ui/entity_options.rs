use ddd_repository::entity::Entity;
use ddd_repository::value::Value;
use ddd_repository_macros::entity;
use std::fmt;

#[entity(name = "customer", debug = false)]
struct CustomerRecord {
    id: String,
    name: String,
    #[field(skip)]
    cache: Vec<u8>,
    nickname: Option<String>,
}

impl fmt::Debug for CustomerRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CustomerRecord")
    }
}

fn main() {
    let customer = CustomerRecord {
        id: "c-1".to_string(),
        name: "alice".to_string(),
        cache: vec![1, 2],
        nickname: None,
    };

    assert_eq!(CustomerRecord::TYPE, "customer");
    assert_eq!(customer.id(), "c-1");
    assert_eq!(customer.field("cache"), None);
    assert_eq!(customer.field("nickname"), Some(Value::Null));
    assert_eq!(format!("{customer:?}"), "CustomerRecord");
    assert_eq!(customer.clone().cache.len(), 2);
}
