//! Reporting interface for accepted steps.
//!
//! Solvers call a [`StepObserver`] once before the first step, after the
//! initial state and every accepted step, and once at the end. The
//! [`Recorder`] keeps the samples of a list of [`SensorNode`]s in memory;
//! persisting them is left to the caller.

use nalgebra::DVector;
use sim_types::{AnalysisType, NodalField, NodeId, Result, SimError};

use crate::integrator::{SolveSummary, StepReport};
use crate::model::Model;

/// Callbacks at step boundaries.
pub trait StepObserver {
    /// Called before the first step with the number of steps to come.
    fn initialize(&mut self, model: &Model, steps: usize) -> Result<()> {
        let _ = (model, steps);
        Ok(())
    }

    /// Called with the initial state (step 0) and after each accepted step.
    fn log_step(&mut self, model: &Model, report: &StepReport) -> Result<()>;

    /// Called after the last step.
    fn finalize(&mut self, model: &Model, summary: &SolveSummary) -> Result<()> {
        let _ = (model, summary);
        Ok(())
    }
}

/// A nodal field to sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SensorNode {
    /// Sampled node.
    pub node: NodeId,
    /// Sampled field.
    pub field: NodalField,
}

impl SensorNode {
    /// Sensor on `field` of `node`.
    #[must_use]
    pub const fn new(node: NodeId, field: NodalField) -> Self {
        Self { node, field }
    }

    /// Group name of the sensor: the node name, or `node_<index>`.
    pub fn group_name(&self, model: &Model) -> Result<String> {
        let node = model.node(self.node)?;
        Ok(node
            .name()
            .map_or_else(|| format!("node_{}", self.node.index()), str::to_owned))
    }

    /// Dataset name of the sensor.
    #[must_use]
    pub fn dataset_name(&self) -> &'static str {
        self.field.label()
    }

    /// Number of values per sample.
    pub fn dataset_size(&self, model: &Model) -> Result<usize> {
        let node = model.node(self.node)?;
        Ok(match self.field {
            NodalField::Motion => node.motion_coordinates(0).len(),
            NodalField::Velocity | NodalField::Acceleration => node.number_of_dofs(),
        })
    }

    /// Current value of the sampled field.
    pub fn sample(&self, model: &Model) -> Result<DVector<f64>> {
        model.nodal_field(self.node, self.field)
    }
}

/// One recorded step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    /// Step index.
    pub step: usize,
    /// Time of the step.
    pub time: f64,
    /// Mechanical power.
    pub mechanical_power: f64,
    /// Newton corrections of the step.
    pub iterations: usize,
    /// One sample per sensor, in sensor order.
    pub samples: Vec<DVector<f64>>,
}

/// In-memory logger recording every `periodicity`-th step.
#[derive(Debug, Clone)]
pub struct Recorder {
    periodicity: usize,
    sensors: Vec<SensorNode>,
    records: Vec<StepRecord>,
}

impl Default for Recorder {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Recorder {
    /// Recorder keeping steps whose index is a multiple of `periodicity`.
    /// A periodicity of 0 is treated as 1.
    #[must_use]
    pub fn new(periodicity: usize) -> Self {
        Self {
            periodicity: periodicity.max(1),
            sensors: Vec::new(),
            records: Vec::new(),
        }
    }

    /// Add a sensor.
    #[must_use]
    pub fn with_sensor(mut self, sensor: SensorNode) -> Self {
        self.sensors.push(sensor);
        self
    }

    /// Add a sensor.
    pub fn add_sensor(&mut self, sensor: SensorNode) {
        self.sensors.push(sensor);
    }

    /// Sensors in recording order.
    #[must_use]
    pub fn sensors(&self) -> &[SensorNode] {
        &self.sensors
    }

    /// Recorded steps.
    #[must_use]
    pub fn records(&self) -> &[StepRecord] {
        &self.records
    }

    /// Samples of sensor `index` over the recorded steps.
    pub fn series(&self, index: usize) -> impl Iterator<Item = (f64, &DVector<f64>)> + '_ {
        self.records
            .iter()
            .filter_map(move |r| r.samples.get(index).map(|s| (r.time, s)))
    }
}

impl StepObserver for Recorder {
    fn initialize(&mut self, model: &Model, steps: usize) -> Result<()> {
        for sensor in &self.sensors {
            model.node(sensor.node)?;
            if sensor.field != NodalField::Motion
                && model.analysis() != Some(AnalysisType::Dynamic)
            {
                return Err(SimError::invalid_config(format!(
                    "{} sensor on {} needs a dynamic analysis",
                    sensor.dataset_name(),
                    sensor.node
                )));
            }
        }
        self.records.clear();
        self.records.reserve(steps / self.periodicity + 1);
        Ok(())
    }

    fn log_step(&mut self, model: &Model, report: &StepReport) -> Result<()> {
        if report.step % self.periodicity != 0 {
            return Ok(());
        }
        let samples = self
            .sensors
            .iter()
            .map(|sensor| sensor.sample(model))
            .collect::<Result<Vec<_>>>()?;
        self.records.push(StepRecord {
            step: report.step,
            time: report.time,
            mechanical_power: report.mechanical_power,
            iterations: report.iterations,
            samples,
        });
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::float_cmp)]
mod tests {
    use super::*;
    use crate::{Node, RigidBodyProperties};
    use nalgebra::Vector3;
    use sim_lie::Frame;
    use sim_types::Field;

    fn single_body() -> (Model, NodeId) {
        let mut model = Model::new();
        let a = model
            .add_node(Node::frame(Frame::identity()).with_name("tip"))
            .unwrap();
        model
            .add_element(
                RigidBodyProperties::with_principal_inertia(1.0, Vector3::new(1.0, 1.0, 1.0)),
                &[a],
            )
            .unwrap();
        (model, a)
    }

    fn report(step: usize) -> StepReport {
        StepReport {
            step,
            time: step as f64,
            iterations: 1,
            converged: true,
            norm_res_forces: 0.0,
            norm_res_constraints: 0.0,
            mechanical_power: 0.0,
        }
    }

    #[test]
    fn test_sensor_names() {
        let (mut model, a) = single_body();
        let b = model.add_node(Node::frame(Frame::identity())).unwrap();
        let motion = SensorNode::new(a, NodalField::Motion);
        let velocity = SensorNode::new(b, NodalField::Velocity);
        assert_eq!(motion.group_name(&model).unwrap(), "tip");
        assert_eq!(velocity.group_name(&model).unwrap(), "node_1");
        assert_eq!(motion.dataset_name(), "MOTION");
        assert_eq!(motion.dataset_size(&model).unwrap(), 7);
        assert_eq!(velocity.dataset_size(&model).unwrap(), 6);
    }

    #[test]
    fn test_periodicity() {
        let (mut model, a) = single_body();
        model.initialize(AnalysisType::Dynamic).unwrap();
        let mut recorder = Recorder::new(2)
            .with_sensor(SensorNode::new(a, NodalField::Motion))
            .with_sensor(SensorNode::new(a, NodalField::Velocity));
        recorder.initialize(&model, 5).unwrap();
        for step in 0..=5 {
            recorder.log_step(&model, &report(step)).unwrap();
        }
        let steps: Vec<usize> = recorder.records().iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 2, 4]);
        assert_eq!(recorder.records()[0].samples[0][3], 1.0);
        assert_eq!(recorder.series(1).count(), 3);
    }

    #[test]
    fn test_rate_sensor_needs_dynamics() {
        let (mut model, a) = single_body();
        model.initialize(AnalysisType::Static).unwrap();
        let mut recorder =
            Recorder::default().with_sensor(SensorNode::new(a, NodalField::Acceleration));
        assert!(recorder.initialize(&model, 1).unwrap_err().is_config_error());

        let mut missing = Recorder::default();
        missing.add_sensor(SensorNode::new(NodeId::new(Field::Motion, 9), NodalField::Motion));
        assert!(missing.initialize(&model, 1).is_err());
    }
}
