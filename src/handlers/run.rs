//! Run handler: one snippet through the session sandbox.

use crate::execution::{ExecutionResult, SessionController};
use crate::printer::ResultPrinter;

pub async fn run(controller: &SessionController, source: &str, color: bool) -> ExecutionResult {
    let result = controller.execute(source).await;
    ResultPrinter { color }.print(&result);
    result
}
