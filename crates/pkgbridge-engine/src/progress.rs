/// A progress counter as the engine reports it: a named task with either a
/// percentage or no measurable value at all.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressData {
    name: String,
    value: Option<i64>,
}

impl ProgressData {
    /// Task with no measurable value yet.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            value: None,
        }
    }

    pub fn with_value(name: &str, value: i64) -> Self {
        Self {
            name: name.to_owned(),
            value: Some(value.clamp(0, 100)),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_value(&mut self, value: i64) {
        self.value = Some(value.clamp(0, 100));
    }

    /// Percentage, or -1 for a task that is only known to be alive.
    pub fn report_value(&self) -> i64 {
        self.value.unwrap_or(-1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indeterminate_reports_minus_one() {
        let mut task = ProgressData::new("Refreshing");
        assert_eq!(task.report_value(), -1);
        task.set_value(140);
        assert_eq!(task.report_value(), 100);
        assert_eq!(ProgressData::with_value("x", -3).report_value(), 0);
    }
}
