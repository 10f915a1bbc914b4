use ddd_repository::entity::Entity;
use ddd_repository::value::Value;
use ddd_repository_macros::entity;

#[entity(id = i64)]
struct OrderLine {
    product: String,
    quantity: u32,
}

fn main() {
    let mut line = OrderLine {
        id: 7,
        product: "pen".to_string(),
        quantity: 2,
    };

    assert_eq!(OrderLine::TYPE, "order_line");
    assert_eq!(line.identity().to_string(), "order_line#7");
    assert_eq!(line.field("quantity"), Some(Value::Int(2)));

    line.set_field("quantity", Value::Int(3)).unwrap();
    assert_eq!(line.quantity, 3);
    assert!(line.set_field("missing", Value::Null).is_err());

    let copy = line.clone();
    let _ = format!("{copy:?}");
}
