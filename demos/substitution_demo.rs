// Substitution demonstration
// Resolves variables and expressions in a small document

use serde_json::json;
use yamlscript::ast::BinaryOp;
use yamlscript::evaluator::binary_op;
use yamlscript::{Environment, Substitution, Value};

fn main() {
    println!("Substitution Demo\n");
    println!("=================\n");

    let context = json!({
        "user": {"name": "Alice", "plan": "pro"},
        "prices": [12, 30, 8],
        "trial_days": 14
    });

    let environment = Environment::default().with_function("double", |_, args| {
        let x = args.positional.first().cloned().unwrap_or(Value::Int(0));
        binary_op(BinaryOp::Multiply, &x, &Value::Int(2))
    });

    let substitution = match Substitution::new()
        .with_context(context)
        .with_environment(environment)
        .with_overrides([("user/plan", Value::from("enterprise"))])
    {
        Ok(substitution) => substitution,
        Err(e) => {
            println!("Error: {}", e);
            return;
        }
    };

    let document = Value::from(json!({
        "greeting": "Hello ${user.name}, you are on the ${user.plan} plan",
        "total": "$(sum(${prices}))",
        "doubled": "$([double(p) for p in ${prices}])",
        "trial_ends": "$(today() + days(${trial_days}))",
        "literal": "Write \\${user.name} to reference a variable",
        "untouched": [1, 2.5, true, null]
    }));

    match substitution.apply(&document) {
        Ok(result) => match result.to_json_string_pretty() {
            Ok(text) => println!("{}", text),
            Err(e) => println!("Error: {}", e),
        },
        Err(e) => println!("Error: {}", e),
    }
}
