#[cfg(test)]
mod events_tests;
#[cfg(test)]
mod orchestrator_tests;
