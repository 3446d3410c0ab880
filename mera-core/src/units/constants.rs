//! Physical constants in cgs.

// lengths [cm]
pub const MPC: f64 = 3.085_677_581_28e24;
pub const KPC: f64 = 3.085_677_581_28e21;
pub const PC: f64 = 3.085_677_581_28e18;
pub const MILLI_PC: f64 = 3.085_677_581_28e15;
pub const LY: f64 = 9.460_730_472_580_8e17;
pub const AU: f64 = 1.495_978_707e13;
pub const KM: f64 = 1.0e5;
pub const M: f64 = 1.0e2;
pub const MM: f64 = 1.0e-1;
pub const UM: f64 = 1.0e-4;

// masses [g]
pub const MSOL: f64 = 1.988_47e33;
pub const MEARTH: f64 = 5.9722e27;
pub const MJUPITER: f64 = 1.898_13e30;
pub const MH: f64 = 1.673_557_5e-24;

// times [s], Julian year
pub const YR: f64 = 3.155_76e7;
pub const MYR: f64 = 3.155_76e13;
pub const GYR: f64 = 3.155_76e16;

pub const KB: f64 = 1.380_649e-16;
pub const C: f64 = 2.997_924_58e10;
pub const EV: f64 = 1.602_176_634e-12;
pub const LSOL: f64 = 3.828e33;
pub const JY: f64 = 1.0e-23;

/// Primordial hydrogen mass fraction.
pub const X_H: f64 = 0.76;
