//! Concentrated load on a frame node.

use std::fmt;
use std::sync::Arc;

use nalgebra::{DVector, Matrix6, Vector6};
use sim_lie::tilde;
use sim_types::Result;

use super::{to_dynamic, AssemblyContext, Connectivity, LoadFunction, LocalTangents};

/// Load applied by an [`ExternalForceElement`].
///
/// The load is `[f; m]`, either constant or a function of time. A global
/// load keeps its direction in space and is rotated into the body frame; a
/// follower load is given in the body frame and turns with it.
#[derive(Clone, Default)]
pub struct ExternalForceProperties {
    load: Vector6<f64>,
    time_dependent: Option<LoadFunction>,
    follower: bool,
}

impl fmt::Debug for ExternalForceProperties {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExternalForceProperties")
            .field("load", &self.load)
            .field("time_dependent", &self.time_dependent.is_some())
            .field("follower", &self.follower)
            .finish()
    }
}

impl ExternalForceProperties {
    /// Constant load.
    #[must_use]
    pub fn constant(load: Vector6<f64>) -> Self {
        Self {
            load,
            ..Self::default()
        }
    }

    /// Load given as a function of time.
    #[must_use]
    pub fn time_dependent(load: impl Fn(f64) -> Vector6<f64> + Send + Sync + 'static) -> Self {
        Self {
            time_dependent: Some(Arc::new(load)),
            ..Self::default()
        }
    }

    /// Express the load in the body frame.
    #[must_use]
    pub fn follower(mut self) -> Self {
        self.follower = true;
        self
    }

    /// Whether the load is expressed in the body frame.
    #[must_use]
    pub fn is_follower(&self) -> bool {
        self.follower
    }

    /// Load at time `t`.
    #[must_use]
    pub fn load_at(&self, time: f64) -> Vector6<f64> {
        self.time_dependent
            .as_ref()
            .map_or(self.load, |load| load(time))
    }
}

/// Concentrated load element.
#[derive(Debug, Clone)]
pub struct ExternalForceElement {
    props: ExternalForceProperties,
}

impl ExternalForceElement {
    pub(crate) fn new(props: ExternalForceProperties) -> Self {
        Self { props }
    }

    /// Properties of the load.
    #[must_use]
    pub fn properties(&self) -> &ExternalForceProperties {
        &self.props
    }

    pub(crate) fn assemble(
        &mut self,
        ctx: &AssemblyContext<'_>,
        conn: &Connectivity,
        res: &mut DVector<f64>,
        tangents: &mut LocalTangents,
    ) -> Result<()> {
        let load = self.props.load_at(ctx.time);
        if self.props.follower {
            res.copy_from(&(-load));
            return Ok(());
        }

        let rt = ctx.frame(conn.motion(0))?.rotation_matrix().transpose();
        let force = -(rt * load.fixed_rows::<3>(0));
        let moment = -(rt * load.fixed_rows::<3>(3));
        res.fixed_rows_mut::<3>(0).copy_from(&force);
        res.fixed_rows_mut::<3>(3).copy_from(&moment);

        let mut stiffness = Matrix6::zeros();
        stiffness.fixed_view_mut::<3, 3>(0, 3).copy_from(&tilde(&force));
        stiffness.fixed_view_mut::<3, 3>(3, 3).copy_from(&tilde(&moment));
        tangents.stiffness = Some(to_dynamic(&stiffness));
        Ok(())
    }
}
