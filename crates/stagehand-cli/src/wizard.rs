//! The interactive wizard: a two-state loop that picks a test, picks the
//! stages to run, launches the test binary and asks whether to go again.

use std::path::Path;

use anyhow::Result;
use stagehand_core::stages::{parse_test_stages, StageList, TestStageMap};
use tracing::{error, info};

use crate::{prompt, runner};

enum WizardState {
    ChooseTest,
    RunTest,
}

/// Runs the wizard loop until the user quits. Test failures are reported and
/// looped over; they never end the session.
pub async fn run(
    package_dir: &Path,
    package_name: &str,
    initial_map: TestStageMap,
) -> Result<()> {
    let mut state = WizardState::ChooseTest;
    let mut stage_map = initial_map;
    let mut current_test = String::new();
    let mut stages_to_run: Vec<String> = Vec::new();

    loop {
        // Re-analyze every cycle so edits made between runs show up in the
        // menus. On failure keep the previous map and start over at the test
        // menu.
        match parse_test_stages(package_dir, package_name) {
            Ok(map) => stage_map = map,
            Err(e) => {
                error!("failed to re-analyze test package: {e}");
                state = WizardState::ChooseTest;
            }
        }

        match state {
            WizardState::ChooseTest => {
                let test_names: Vec<String> = stage_map.keys().cloned().collect();
                let Some(choice) = prompt::select("Choose test to run:", &test_names)? else {
                    return Ok(());
                };
                current_test = test_names[choice].clone();
                stages_to_run = stage_names(&stage_map[&current_test]);
                state = WizardState::RunTest;
            }
            WizardState::RunTest => {
                let Some(stages) = stage_map.get(&current_test) else {
                    info!("test {current_test} no longer exists, choosing another");
                    state = WizardState::ChooseTest;
                    continue;
                };
                let current_stages = stage_names(stages);
                stages_to_run.retain(|stage| current_stages.contains(stage));

                let preselected: Vec<bool> = current_stages
                    .iter()
                    .map(|stage| stages_to_run.contains(stage))
                    .collect();
                let selected =
                    prompt::multi_select("Choose test stages to run:", &current_stages, &preselected)?;
                stages_to_run = selected
                    .into_iter()
                    .map(|i| current_stages[i].clone())
                    .collect();
                let stages_to_skip: Vec<String> = current_stages
                    .iter()
                    .filter(|stage| !stages_to_run.contains(stage))
                    .cloned()
                    .collect();

                info!("selected to run test {current_test} with stages:");
                for stage in &stages_to_run {
                    info!("\t- {stage}");
                }
                info!("running test");
                if let Err(e) = runner::run_test(package_dir, &current_test, &stages_to_skip).await
                {
                    // A failing test must not exit the interactive runner.
                    error!("error running test {current_test}: {e:#}");
                }

                if !prompt::confirm(&format!("Continue running {current_test}?"))? {
                    state = WizardState::ChooseTest;
                }
            }
        }
    }
}

fn stage_names(stages: &StageList) -> Vec<String> {
    stages.iter().map(|stage| stage.name.clone()).collect()
}
