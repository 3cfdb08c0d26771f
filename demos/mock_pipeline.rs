//! Example: the summarize-and-route pipeline against a scripted model.
//!
//! Run with: `cargo run --example mock_pipeline`

use notebook_agent::{
    resolve, DestinationInventory, MockBackend, ModelConfig, ModelInvoker, StructuredPipeline,
};
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // First answer has no JSON, so the pipeline spends its one retry.
    let mock = MockBackend::new(vec![
        "This looks like meeting notes for the Work notebook.".to_string(),
        r#"{"summary_md": "- Beta ships Friday\n- Alice owns QA\n- Next sync Monday", "route": {"notebook": "Work", "section": "Standups"}}"#.to_string(),
    ]);

    let invoker = ModelInvoker::builder(ModelConfig::default())
        .backend(Arc::new(mock))
        .build();
    let pipeline = StructuredPipeline::new(Arc::new(invoker));

    let inventory = DestinationInventory::new()
        .with("Work", ["Meetings", "Projects"])
        .with("Personal", ["Tasks"]);

    let (output, diag) = pipeline
        .run_with_diagnostics("Standup: beta Friday, Alice on QA, sync Monday.", &inventory)
        .await?;
    println!("Outcome: {:?} after {} call(s)", diag.outcome, diag.model_calls);
    println!("Summary:\n{}", output.summary_md);
    println!("Model suggested: {:?}", output.route);

    // "Standups" does not exist, so resolution falls back.
    let route = resolve(&output.route, &inventory, Some("Work"), Some("Meetings"));
    println!("Filing under: {:?} / {:?}", route.notebook, route.section);

    Ok(())
}
