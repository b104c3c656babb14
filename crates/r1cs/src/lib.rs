//! Constraint system core for umbra circuits.
//!
//! Circuits are written once against the [`circuit::Driver`] trait and run through an
//! [`R1csDriver`] twice: in compile mode to fix the constraint structure, and in prove
//! mode to assign a witness. The recorded system is then checked for satisfaction or
//! handed to the Groth16 backend.

pub mod backend;
pub mod backend_groth16;
pub mod field;
pub mod gadgets;
pub mod r1cs;

pub mod circuit {
    use crate::r1cs::Wire;
    use anyhow::Result;
    use ff::PrimeField;

    /// Out-of-circuit helper computing witness values from input values.
    ///
    /// Hints only run when the driver is assigning a witness; their outputs are
    /// unconstrained until the caller constrains them.
    pub type Hint<F> = fn(&[F]) -> Result<Vec<F>>;

    /// Driver abstraction: allocation, multiplication constraints and hints.
    pub trait Driver {
        type F: PrimeField;

        /// True when values are being assigned (prove mode).
        fn has_witness(&self) -> bool;

        /// Allocate a private variable; `value` is only called when assigning a witness.
        fn alloc_witness(&mut self, value: impl FnOnce() -> Result<Self::F>) -> Result<Wire<Self::F>>;

        /// Allocate a public input. Public inputs are ordered by allocation.
        fn alloc_instance(&mut self, value: impl FnOnce() -> Result<Self::F>) -> Result<Wire<Self::F>>;

        /// Current value of a wire, if every variable it references is assigned.
        fn value(&self, wire: &Wire<Self::F>) -> Option<Self::F>;

        /// Enforce a * b = c.
        fn enforce_mul(
            &mut self,
            label: &'static str,
            a: &Wire<Self::F>,
            b: &Wire<Self::F>,
            c: &Wire<Self::F>,
        ) -> Result<()>;

        /// Enforce a = b.
        fn enforce_equal(&mut self, label: &'static str, a: &Wire<Self::F>, b: &Wire<Self::F>) -> Result<()> {
            self.enforce_mul(label, &(a - b), &Wire::one(), &Wire::zero())
        }

        /// Run a named hint and allocate its `outputs` results as witnesses.
        fn hint(
            &mut self,
            name: &'static str,
            f: Hint<Self::F>,
            inputs: &[Wire<Self::F>],
            outputs: usize,
        ) -> Result<Vec<Wire<Self::F>>>;
    }

    /// A circuit that can be synthesized against any driver over field `F`.
    pub trait Circuit<F: PrimeField> {
        /// Domain name used for the structure digest.
        fn name(&self) -> &'static str;

        fn synthesize<D: Driver<F = F>>(&self, dr: &mut D) -> Result<()>;
    }
}

pub use backend::{check_satisfied, compile, is_satisfied, public_inputs, synthesize_witness, SatisfactionError};
pub use backend_groth16::R1csGroth16Backend;
pub use circuit::{Circuit, Driver, Hint};
pub use r1cs::{LinearCombination, R1csDriver, R1csRecorder, SynthesisMode, Var, VarKind, Wire};
