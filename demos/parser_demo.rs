// Parser demonstration
// This example shows the AST produced for a few expressions

use yamlscript::parser;

fn show(title: &str, expr: &str) {
    println!("{}", title);
    match parser::parse(expr) {
        Ok(ast) => println!("  '{}' => {:?}\n", expr, ast),
        Err(e) => println!("  Error: {}\n", e),
    }
}

fn main() {
    println!("Expression Parser Demo\n");
    println!("======================\n");

    show("Example 1: Simple arithmetic", "1 + 2 * 3");
    show("Example 2: Function call with keywords", "date(year=1970, month=1, day=1)");
    show("Example 3: Subscript and slice", "names[0]['name'][1:3]");
    show("Example 4: List comprehension", "[i * 2 for i in ints if i > 1]");
    show(
        "Example 5: Dict comprehension with tuple target",
        "{item['name']: index for index, item in enumerate(names)}",
    );
    show("Example 6: Lambda argument", "filter(lambda i: i > 1, ints)");
    show("Example 7: Conditional expression", "'big' if n > 10 else 'small'");
    show("Example 8: Chained comparison", "0 <= x < 10");
    show("Example 9: Unclosed call", "sum(1, 2");
}
