//! Compilation, witness synthesis and satisfaction checking for recorded circuits.

use anyhow::Result;
use ff::PrimeField;
use thiserror::Error;
use tracing::debug;

use crate::circuit::Circuit;
use crate::r1cs::{LinearCombination, R1csDriver, R1csRecorder, Var};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SatisfactionError {
    #[error("variable {0} has no assignment")]
    MissingAssignment(usize),
    #[error("constraint {id} ({label}) is not satisfied")]
    Unsatisfied { id: u64, label: String },
}

/// Record the constraint structure of `circuit` without computing any values.
pub fn compile<F: PrimeField, C: Circuit<F>>(circuit: &C) -> Result<R1csRecorder<F>> {
    let mut dr = R1csDriver::compile();
    circuit.synthesize(&mut dr)?;
    debug!(
        circuit = circuit.name(),
        vars = dr.r1cs.num_vars(),
        constraints = dr.r1cs.num_constraints(),
        "compiled"
    );
    Ok(dr.into_recorder())
}

/// Record the structure of `circuit` together with a full witness assignment.
pub fn synthesize_witness<F: PrimeField, C: Circuit<F>>(circuit: &C) -> Result<R1csRecorder<F>> {
    let mut dr = R1csDriver::prove();
    circuit.synthesize(&mut dr)?;
    debug!(
        circuit = circuit.name(),
        vars = dr.r1cs.num_vars(),
        constraints = dr.r1cs.num_constraints(),
        hints = dr.r1cs.hints.len(),
        "witness synthesized"
    );
    Ok(dr.into_recorder())
}

fn eval<F: PrimeField>(rec: &R1csRecorder<F>, lc: &LinearCombination<F>) -> Result<F, SatisfactionError> {
    let mut acc = lc.constant;
    for t in &lc.terms {
        let v = rec.get_assignment(t.var).ok_or(SatisfactionError::MissingAssignment(t.var.0))?;
        acc += v * t.coeff;
    }
    Ok(acc)
}

/// Check every constraint <A,x> * <B,x> = <C,x>; reports the first failing one.
pub fn check_satisfied<F: PrimeField>(rec: &R1csRecorder<F>) -> Result<(), SatisfactionError> {
    for (i, _) in rec.vars.iter().enumerate() {
        if rec.get_assignment(Var(i)).is_none() {
            return Err(SatisfactionError::MissingAssignment(i));
        }
    }
    for c in &rec.constraints {
        let a = eval(rec, &c.a)?;
        let b = eval(rec, &c.b)?;
        let cc = eval(rec, &c.c)?;
        if a * b != cc {
            return Err(SatisfactionError::Unsatisfied {
                id: c.id,
                label: c.label.clone().unwrap_or_default(),
            });
        }
    }
    Ok(())
}

pub fn is_satisfied<F: PrimeField>(rec: &R1csRecorder<F>) -> bool {
    check_satisfied(rec).is_ok()
}

/// Assigned public inputs in allocation order.
pub fn public_inputs<F: PrimeField>(rec: &R1csRecorder<F>) -> Result<Vec<F>, SatisfactionError> {
    rec.instance_vars()
        .into_iter()
        .map(|v| rec.get_assignment(v).ok_or(SatisfactionError::MissingAssignment(v.0)))
        .collect()
}
