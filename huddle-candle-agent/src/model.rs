//! Interface of neural networks used in the learners.
use crate::opt::{Optimizer, OptimizerConfig};
use anyhow::Result;
use candle_core::{DType, Device, Tensor};
use candle_nn::{VarBuilder, VarMap};
use log::info;
use std::path::Path;

/// Neural network model not owning its [`VarMap`] internally.
///
/// [`VarMap`]: candle_nn::VarMap
pub trait SubModel1 {
    /// Configuration from which [`SubModel1`] is constructed.
    type Config;

    /// Input of the [`SubModel1`].
    type Input;

    /// Output of the [`SubModel1`].
    type Output;

    /// Builds [`SubModel1`] with [`VarBuilder`] and [`SubModel1::Config`].
    ///
    /// [`VarBuilder`]: candle_nn::VarBuilder
    fn build(vb: VarBuilder, config: Self::Config) -> Self;

    /// A generalized forward function.
    fn forward(&self, input: &Self::Input) -> Self::Output;
}

/// A [`SubModel1`] together with the [`VarMap`] holding its parameters and
/// the optimizer updating them.
///
/// The policy, value and action-value networks of the learners are all
/// instances of this wrapper; they differ only in their submodel
/// configuration.
///
/// [`VarMap`]: candle_nn::VarMap
pub struct NetModel<M>
where
    M: SubModel1<Output = Tensor>,
{
    varmap: VarMap,
    net: M,
    opt: Optimizer,
}

impl<M> NetModel<M>
where
    M: SubModel1<Output = Tensor>,
{
    /// Constructs [`NetModel`] with fresh, randomly initialized parameters.
    pub fn build(
        net_config: M::Config,
        opt_config: &OptimizerConfig,
        device: &Device,
    ) -> Result<Self> {
        let varmap = VarMap::new();
        let net = {
            let vb = VarBuilder::from_varmap(&varmap, DType::F32, device);
            M::build(vb, net_config)
        };
        let opt = opt_config.build(varmap.all_vars())?;

        Ok(Self { varmap, net, opt })
    }

    /// Outputs of the wrapped network for the given input.
    pub fn forward(&self, input: &M::Input) -> Tensor {
        self.net.forward(input)
    }

    /// Computes gradients of the loss and applies one optimizer step.
    pub fn backward_step(&mut self, loss: &Tensor) -> Result<()> {
        self.opt.backward_step(loss)
    }

    /// The [`VarMap`] holding the parameters.
    ///
    /// [`VarMap`]: candle_nn::VarMap
    pub fn varmap(&self) -> &VarMap {
        &self.varmap
    }

    /// Saves the parameters to the given file.
    pub fn save<T: AsRef<Path>>(&self, path: T) -> Result<()> {
        self.varmap.save(&path)?;
        info!("saved model parameters to {:?}", path.as_ref());
        Ok(())
    }

    /// Loads the parameters from the given file.
    pub fn load<T: AsRef<Path>>(&mut self, path: T) -> Result<()> {
        self.varmap.load(&path)?;
        info!("loaded model parameters from {:?}", path.as_ref());
        Ok(())
    }
}
