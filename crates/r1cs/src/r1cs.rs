//! R1CS recorder and the recording driver.
//! Provides:
//! - Rank-1 constraint recorder with deterministic variable and constraint ordering
//! - Linear-combination wires; addition and constant scaling never emit constraints
//! - A driver that records structure and, in prove mode, witness assignments and hint outputs
//! - Structure digest and bincode persistence of the recorded system

use anyhow::{anyhow, bail, Result};
use blake3::Hasher as Blake3Hasher;
use ff::{Field, PrimeField};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::{Add, Mul, Neg, Sub};

use crate::circuit::{Driver, Hint};

/// Unique identifier for a variable within the recorder
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Var(pub usize);

/// Variable kind for bookkeeping
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum VarKind {
    Witness,
    Instance,
}

/// A hint invocation: the named function produced these witness variables.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HintRecord {
    pub name: String,
    pub outputs: Vec<Var>,
}

/// A single term of a linear combination: coeff * var
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearTerm<F: Field> {
    pub var: Var,
    pub coeff: F,
}

/// A linear combination: sum_i coeff_i * var_i + constant
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinearCombination<F: Field> {
    pub terms: Vec<LinearTerm<F>>,
    pub constant: F,
}

impl<F: Field> LinearCombination<F> {
    pub fn zero() -> Self { Self { terms: Vec::new(), constant: F::ZERO } }
    pub fn one() -> Self { Self { terms: Vec::new(), constant: F::ONE } }

    #[inline]
    pub fn with_constant(mut self, c: F) -> Self { self.constant = c; self }

    #[inline]
    pub fn push_term(&mut self, var: Var, coeff: F) { self.terms.push(LinearTerm { var, coeff }); }

    /// Convenience builder: lc + coeff * var
    #[inline]
    pub fn add_term(mut self, var: Var, coeff: F) -> Self { self.push_term(var, coeff); self }

    /// Merge repeated variables and drop zero coefficients, ordering terms by variable.
    pub fn compact(mut self) -> Self {
        self.terms.sort_by_key(|t| t.var);
        let mut merged: Vec<LinearTerm<F>> = Vec::with_capacity(self.terms.len());
        for t in self.terms {
            match merged.last_mut() {
                Some(last) if last.var == t.var => last.coeff += t.coeff,
                _ => merged.push(t),
            }
        }
        merged.retain(|t| !t.coeff.is_zero_vartime());
        self.terms = merged;
        self
    }

    /// Value of the combination, or `None` if any variable is unassigned.
    pub fn evaluate(&self, get: impl Fn(Var) -> Option<F>) -> Option<F> {
        let mut acc = self.constant;
        for t in &self.terms {
            acc += get(t.var)? * t.coeff;
        }
        Some(acc)
    }
}

/// One R1CS constraint: <A, x> * <B, x> = <C, x>
#[derive(Clone, Debug)]
pub struct Constraint<F: Field> {
    pub id: u64,
    pub label: Option<String>,
    pub a: LinearCombination<F>,
    pub b: LinearCombination<F>,
    pub c: LinearCombination<F>,
}

/// In-memory recorder for variables and constraints
#[derive(Clone, Debug)]
pub struct R1csRecorder<F: Field> {
    next_var: usize,
    next_constraint_id: u64,
    pub vars: Vec<VarKind>,
    pub constraints: Vec<Constraint<F>>,
    /// Witness assignment; empty for a compiled (structure-only) recorder
    pub assignments: HashMap<Var, F>,
    /// Hint invocations recorded in order
    pub hints: Vec<HintRecord>,
}

impl<F: Field> Default for R1csRecorder<F> {
    fn default() -> Self {
        Self {
            next_var: 0,
            next_constraint_id: 0,
            vars: Vec::new(),
            constraints: Vec::new(),
            assignments: HashMap::new(),
            hints: Vec::new(),
        }
    }
}

impl<F: Field> R1csRecorder<F> {
    pub fn new() -> Self { Self::default() }

    #[inline]
    pub fn alloc_witness(&mut self) -> Var {
        let v = Var(self.next_var);
        self.next_var += 1;
        self.vars.push(VarKind::Witness);
        v
    }

    #[inline]
    pub fn alloc_instance(&mut self) -> Var {
        let v = Var(self.next_var);
        self.next_var += 1;
        self.vars.push(VarKind::Instance);
        v
    }

    #[inline]
    pub fn set_assignment(&mut self, var: Var, value: F) { self.assignments.insert(var, value); }

    #[inline]
    pub fn get_assignment(&self, var: Var) -> Option<F> { self.assignments.get(&var).copied() }

    #[inline]
    pub fn num_vars(&self) -> usize { self.vars.len() }

    #[inline]
    pub fn num_instances(&self) -> usize { self.vars.iter().filter(|k| matches!(k, VarKind::Instance)).count() }

    #[inline]
    pub fn num_constraints(&self) -> usize { self.constraints.len() }

    /// Instance variables in allocation order; this is the public-input order.
    pub fn instance_vars(&self) -> Vec<Var> {
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, k)| matches!(k, VarKind::Instance))
            .map(|(i, _)| Var(i))
            .collect()
    }

    /// Record a multiplication constraint: A * B = C
    pub fn enforce_mul_eq(&mut self, label: Option<&str>, a: LinearCombination<F>, b: LinearCombination<F>, c: LinearCombination<F>) {
        let id = self.next_constraint_id;
        self.next_constraint_id += 1;
        self.constraints.push(Constraint {
            id,
            label: label.map(|s| s.to_string()),
            a,
            b,
            c,
        });
    }

    /// Enforce a linear combination equals zero: lc == 0
    pub fn enforce_zero(&mut self, label: Option<&str>, lc: LinearCombination<F>) {
        // Encode as lc * 1 = 0
        self.enforce_mul_eq(label, lc, LinearCombination::one(), LinearCombination::zero());
    }

    /// Record that the named hint produced `outputs`.
    pub fn emit_hint(&mut self, name: &str, outputs: &[Var]) {
        self.hints.push(HintRecord { name: name.to_string(), outputs: outputs.to_vec() });
    }
}

/// A circuit wire: a linear combination of recorder variables plus a constant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Wire<F: Field> {
    lc: LinearCombination<F>,
}

impl<F: Field> Wire<F> {
    pub fn constant(value: F) -> Self { Self { lc: LinearCombination::zero().with_constant(value) } }
    pub fn zero() -> Self { Self::constant(F::ZERO) }
    pub fn one() -> Self { Self::constant(F::ONE) }

    pub fn from_var(var: Var) -> Self { Self { lc: LinearCombination::zero().add_term(var, F::ONE) } }

    pub fn from_lc(lc: LinearCombination<F>) -> Self { Self { lc: lc.compact() } }

    /// Σ coeff_i · wire_i, compacted once.
    pub fn linear_sum<'a>(items: impl IntoIterator<Item = (&'a Wire<F>, F)>) -> Self
    where
        F: 'a,
    {
        let mut lc = LinearCombination::zero();
        for (w, k) in items {
            lc.constant += w.lc.constant * k;
            for t in &w.lc.terms {
                lc.push_term(t.var, t.coeff * k);
            }
        }
        Self::from_lc(lc)
    }

    #[inline]
    pub fn lc(&self) -> &LinearCombination<F> { &self.lc }

    /// The constant value, when the wire references no variables.
    #[inline]
    pub fn as_constant(&self) -> Option<F> { self.lc.terms.is_empty().then_some(self.lc.constant) }

    pub fn scale(&self, k: F) -> Self {
        if k.is_zero_vartime() {
            return Self::zero();
        }
        let mut lc = self.lc.clone();
        lc.constant *= k;
        for t in lc.terms.iter_mut() {
            t.coeff *= k;
        }
        Self { lc }
    }

    pub fn add_constant(&self, c: F) -> Self {
        let mut lc = self.lc.clone();
        lc.constant += c;
        Self { lc }
    }
}

impl<F: Field> From<F> for Wire<F> {
    fn from(value: F) -> Self { Self::constant(value) }
}

impl<'a, 'b, F: Field> Add<&'b Wire<F>> for &'a Wire<F> {
    type Output = Wire<F>;

    fn add(self, rhs: &'b Wire<F>) -> Wire<F> {
        let mut lc = self.lc.clone();
        lc.terms.extend(rhs.lc.terms.iter().cloned());
        lc.constant += rhs.lc.constant;
        Wire { lc: lc.compact() }
    }
}

impl<'b, F: Field> Add<&'b Wire<F>> for Wire<F> {
    type Output = Wire<F>;

    fn add(self, rhs: &'b Wire<F>) -> Wire<F> { &self + rhs }
}

impl<'a, 'b, F: Field> Sub<&'b Wire<F>> for &'a Wire<F> {
    type Output = Wire<F>;

    fn sub(self, rhs: &'b Wire<F>) -> Wire<F> { self + &(-rhs) }
}

impl<'b, F: Field> Sub<&'b Wire<F>> for Wire<F> {
    type Output = Wire<F>;

    fn sub(self, rhs: &'b Wire<F>) -> Wire<F> { &self - rhs }
}

impl<'a, F: Field> Neg for &'a Wire<F> {
    type Output = Wire<F>;

    fn neg(self) -> Wire<F> { self.scale(-F::ONE) }
}

impl<'a, F: Field> Mul<F> for &'a Wire<F> {
    type Output = Wire<F>;

    fn mul(self, rhs: F) -> Wire<F> { self.scale(rhs) }
}

impl<F: Field> Mul<F> for Wire<F> {
    type Output = Wire<F>;

    fn mul(self, rhs: F) -> Wire<F> { self.scale(rhs) }
}

/// Whether a driver run computes witness values or only records structure.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthesisMode {
    /// Structure only: value closures and hints are never run.
    Compile,
    /// Structure plus assignments for every variable.
    Prove,
}

/// Driver that records constraints and, in prove mode, witness assignments.
pub struct R1csDriver<F: PrimeField> {
    pub r1cs: R1csRecorder<F>,
    mode: SynthesisMode,
}

impl<F: PrimeField> R1csDriver<F> {
    pub fn new(mode: SynthesisMode) -> Self { Self { r1cs: R1csRecorder::new(), mode } }

    pub fn compile() -> Self { Self::new(SynthesisMode::Compile) }

    pub fn prove() -> Self { Self::new(SynthesisMode::Prove) }

    #[inline]
    pub fn mode(&self) -> SynthesisMode { self.mode }

    pub fn into_recorder(self) -> R1csRecorder<F> { self.r1cs }

    fn alloc(&mut self, kind: VarKind, value: impl FnOnce() -> Result<F>) -> Result<Wire<F>> {
        let var = match kind {
            VarKind::Witness => self.r1cs.alloc_witness(),
            VarKind::Instance => self.r1cs.alloc_instance(),
        };
        if self.has_witness() {
            let v = value()?;
            self.r1cs.set_assignment(var, v);
        }
        Ok(Wire::from_var(var))
    }
}

impl<F: PrimeField> Driver for R1csDriver<F> {
    type F = F;

    #[inline]
    fn has_witness(&self) -> bool { self.mode == SynthesisMode::Prove }

    fn alloc_witness(&mut self, value: impl FnOnce() -> Result<F>) -> Result<Wire<F>> {
        self.alloc(VarKind::Witness, value)
    }

    fn alloc_instance(&mut self, value: impl FnOnce() -> Result<F>) -> Result<Wire<F>> {
        self.alloc(VarKind::Instance, value)
    }

    fn value(&self, wire: &Wire<F>) -> Option<F> {
        wire.lc().evaluate(|v| self.r1cs.get_assignment(v))
    }

    fn enforce_mul(&mut self, label: &'static str, a: &Wire<F>, b: &Wire<F>, c: &Wire<F>) -> Result<()> {
        self.r1cs.enforce_mul_eq(Some(label), a.lc().clone(), b.lc().clone(), c.lc().clone());
        Ok(())
    }

    fn hint(&mut self, name: &'static str, f: Hint<F>, inputs: &[Wire<F>], outputs: usize) -> Result<Vec<Wire<F>>> {
        let values = if self.has_witness() {
            let args = inputs
                .iter()
                .map(|w| self.value(w).ok_or_else(|| anyhow!("hint `{}`: input has no assigned value", name)))
                .collect::<Result<Vec<F>>>()?;
            let out = f(&args).map_err(|e| e.context(format!("hint `{}` failed", name)))?;
            if out.len() != outputs {
                bail!("hint `{}` returned {} values, expected {}", name, out.len(), outputs);
            }
            Some(out)
        } else {
            None
        };

        let vars: Vec<Var> = (0..outputs).map(|_| self.r1cs.alloc_witness()).collect();
        if let Some(values) = values {
            for (var, value) in vars.iter().zip(values) {
                self.r1cs.set_assignment(*var, value);
            }
        }
        self.r1cs.emit_hint(name, &vars);
        Ok(vars.into_iter().map(Wire::from_var).collect())
    }
}

/// Canonical transcript digest for recorded R1CS (structure only; excludes witness assignments)
impl<F: PrimeField> R1csRecorder<F> {
    pub fn digest(&self, domain: &[u8]) -> [u8; 32] {
        let mut h = Blake3Hasher::new();
        h.update(b"umbra-r1cs:v1");
        h.update(&(domain.len() as u64).to_le_bytes());
        h.update(domain);
        h.update(&(self.vars.len() as u64).to_le_bytes());
        h.update(&(self.constraints.len() as u64).to_le_bytes());
        h.update(&(self.hints.len() as u64).to_le_bytes());

        for vk in &self.vars {
            match vk { VarKind::Witness => { h.update(&[0u8]); }, VarKind::Instance => { h.update(&[1u8]); } }
        }
        for c in &self.constraints {
            h.update(&c.id.to_le_bytes());
            match &c.label {
                Some(label) => { h.update(&(label.len() as u64).to_le_bytes()); h.update(label.as_bytes()); }
                None => { h.update(&u64::MAX.to_le_bytes()); }
            }
            let mut emit_lc = |lc: &LinearCombination<F>| {
                h.update(lc.constant.to_repr().as_ref());
                h.update(&(lc.terms.len() as u64).to_le_bytes());
                for t in &lc.terms {
                    h.update(&(t.var.0 as u64).to_le_bytes());
                    h.update(t.coeff.to_repr().as_ref());
                }
            };
            emit_lc(&c.a); emit_lc(&c.b); emit_lc(&c.c);
        }
        for hint in &self.hints {
            h.update(&(hint.name.len() as u64).to_le_bytes());
            h.update(hint.name.as_bytes());
            h.update(&(hint.outputs.len() as u64).to_le_bytes());
            for v in &hint.outputs { h.update(&(v.0 as u64).to_le_bytes()); }
        }
        *h.finalize().as_bytes()
    }

    /// Serialize the structure (no witness assignments) to bincode for persistence
    pub fn serialize_constraints(&self) -> Result<Vec<u8>> {
        let to_bytes = |f: &F| f.to_repr().as_ref().to_vec();
        let ser_lc = |lc: &LinearCombination<F>| SerLc {
            terms: lc.terms.iter().map(|t| SerTerm { var: t.var.0 as u64, coeff: to_bytes(&t.coeff) }).collect(),
            constant: to_bytes(&lc.constant),
        };
        let snapshot = Snapshot {
            vars: self.vars.iter().map(|k| match k { VarKind::Witness => 0u8, VarKind::Instance => 1u8 }).collect(),
            constraints: self.constraints.iter().map(|c| SerCons {
                id: c.id,
                label: c.label.clone(),
                a: ser_lc(&c.a),
                b: ser_lc(&c.b),
                c: ser_lc(&c.c),
            }).collect(),
            hints: self.hints.clone(),
        };
        Ok(bincode::serialize(&snapshot)?)
    }

    /// Deserialize a structure written by [`R1csRecorder::serialize_constraints`]
    pub fn deserialize_constraints(bytes: &[u8]) -> Result<R1csRecorder<F>> {
        let snap: Snapshot = bincode::deserialize(bytes)?;
        let vars = snap.vars.into_iter().map(|b| match b {
            0 => Ok(VarKind::Witness),
            1 => Ok(VarKind::Instance),
            other => Err(anyhow!("invalid variable kind tag {}", other)),
        }).collect::<Result<Vec<_>>>()?;
        let num_vars = vars.len();

        let from_bytes = |bytes: &[u8]| -> Result<F> {
            let mut repr = <F as PrimeField>::Repr::default();
            if bytes.len() != repr.as_ref().len() { bail!("wrong field element length {}", bytes.len()); }
            repr.as_mut().copy_from_slice(bytes);
            Option::<F>::from(F::from_repr(repr)).ok_or_else(|| anyhow!("invalid field repr"))
        };
        let parse_lc = |slc: SerLc| -> Result<LinearCombination<F>> {
            let mut lc = LinearCombination { terms: Vec::with_capacity(slc.terms.len()), constant: from_bytes(&slc.constant)? };
            for t in slc.terms {
                let var = Var(t.var as usize);
                if var.0 >= num_vars { bail!("term references unknown variable {}", var.0); }
                lc.push_term(var, from_bytes(&t.coeff)?);
            }
            Ok(lc)
        };

        let mut constraints = Vec::with_capacity(snap.constraints.len());
        for c in snap.constraints {
            constraints.push(Constraint { id: c.id, label: c.label, a: parse_lc(c.a)?, b: parse_lc(c.b)?, c: parse_lc(c.c)? });
        }
        if snap.hints.iter().flat_map(|h| h.outputs.iter()).any(|v| v.0 >= num_vars) {
            bail!("hint references unknown variable");
        }

        Ok(R1csRecorder {
            next_var: num_vars,
            next_constraint_id: constraints.iter().map(|c| c.id).max().map_or(0, |m| m.saturating_add(1)),
            vars,
            constraints,
            assignments: HashMap::new(),
            hints: snap.hints,
        })
    }
}

#[derive(Serialize, Deserialize)]
struct SerTerm { var: u64, coeff: Vec<u8> }
#[derive(Serialize, Deserialize)]
struct SerLc { terms: Vec<SerTerm>, constant: Vec<u8> }
#[derive(Serialize, Deserialize)]
struct SerCons { id: u64, label: Option<String>, a: SerLc, b: SerLc, c: SerLc }
#[derive(Serialize, Deserialize)]
struct Snapshot { vars: Vec<u8>, constraints: Vec<SerCons>, #[serde(default)] hints: Vec<HintRecord> }
