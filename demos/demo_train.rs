use std::sync::Arc;
use treeline::{
    Alternative, OrderingPolicy, ParseConfig, ParserNode, Record, Slot, SubcommandFamily, Value,
    Variant,
};

fn main() {
    let adam = ParserNode::new("Adam")
        .about("Adaptive moment estimation.")
        .slot(Slot::named("lr", Variant::Float).default(Value::Float(0.001)));
    let sgd = ParserNode::new("Sgd")
        .about("Stochastic gradient descent.")
        .slot(Slot::named("lr", Variant::Float).default(Value::Float(0.1)))
        .slot(Slot::named("momentum", Variant::Float).default(Value::Float(0.0)));
    let root = ParserNode::new("Train")
        .about("Train a model.")
        .slot(Slot::positional("dataset", Variant::Str).help("The dataset to train on."))
        .slot(Slot::named("epochs", Variant::Int).default(Value::Int(10)))
        .slot(Slot::counter("verbose").short('v'))
        .family(
            SubcommandFamily::new("optimizer")
                .alternative(Alternative::new("adam", adam))
                .alternative(Alternative::new("sgd", sgd))
                // The default branch is found from the value's shape.
                .default(Arc::new(Value::Record(
                    Record::new("Adam").with("lr", Value::Float(0.001)),
                ))),
        );

    let engine = ParseConfig::new("train")
        .policy(OrderingPolicy::Strict)
        .build(root);
    let value = engine.parse();

    println!("{value}");
}
