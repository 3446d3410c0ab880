//! Small synthetic RAMSES snapshot written into a temporary directory.
//!
//! Two domains, levels 1 to 3, unit box. The level-1 oct refines its lower
//! corner cell into a level-2 oct owned by domain 2, whose upper corner is
//! refined again into a level-3 oct owned by domain 1. Domain 1 also carries
//! the level-2 oct as a ghost so readers have to skip foreign blocks.
#![allow(dead_code)]

use mera_core::InfoRecord;
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;

pub const OUTPUT: u32 = 1;
pub const NCPU: usize = 2;
pub const LEVELMIN: usize = 1;
pub const LEVELMAX: usize = 3;
pub const TIME: f64 = 0.330855641315456;
pub const UNIT_L: f64 = 3.085_677_581_282e21;
pub const UNIT_D: f64 = 6.770_254_301_989_32e-23;
pub const UNIT_T: f64 = 4.704_303_124_236_75e14;
pub const GAMMA: f64 = 1.4;
pub const GAS_VELOCITY: [f64; 3] = [1.0, -2.0, 0.5];

#[derive(Default)]
struct Records(Vec<u8>);

impl Records {
    fn raw(&mut self, payload: &[u8]) -> &mut Self {
        let n = (payload.len() as u32).to_le_bytes();
        self.0.extend_from_slice(&n);
        self.0.extend_from_slice(payload);
        self.0.extend_from_slice(&n);
        self
    }

    fn i32s(&mut self, v: &[i32]) -> &mut Self {
        let b: Vec<u8> = v.iter().flat_map(|x| x.to_le_bytes()).collect();
        self.raw(&b)
    }

    fn f64s(&mut self, v: &[f64]) -> &mut Self {
        let b: Vec<u8> = v.iter().flat_map(|x| x.to_le_bytes()).collect();
        self.raw(&b)
    }

    fn i8s(&mut self, v: &[i8]) -> &mut Self {
        let b: Vec<u8> = v.iter().map(|x| *x as u8).collect();
        self.raw(&b)
    }

    fn i32(&mut self, v: i32) -> &mut Self {
        self.i32s(&[v])
    }

    fn f64(&mut self, v: f64) -> &mut Self {
        self.f64s(&[v])
    }
}

struct Oct {
    level: usize,
    owner: usize,
    center: [f64; 3],
    son: [i32; 8],
}

fn octs() -> [Oct; 3] {
    [
        Oct {
            level: 1,
            owner: 1,
            center: [0.5; 3],
            son: [1, 0, 0, 0, 0, 0, 0, 0],
        },
        Oct {
            level: 2,
            owner: 2,
            center: [0.25; 3],
            son: [0, 0, 0, 0, 0, 0, 0, 1],
        },
        Oct {
            level: 3,
            owner: 1,
            center: [0.375; 3],
            son: [0; 8],
        },
    ]
}

/// Octs present in the files of domain `icpu`, owned or ghost.
fn stored(icpu: usize) -> Vec<Oct> {
    octs()
        .into_iter()
        .filter(|o| o.owner == icpu || (icpu == 1 && o.level == 2))
        .collect()
}

fn slot_center(o: &Oct, slot: usize) -> [f64; 3] {
    let dx = 0.5f64.powi(o.level as i32);
    let off = [slot & 1, (slot >> 1) & 1, (slot >> 2) & 1];
    std::array::from_fn(|k| o.center[k] + (off[k] as f64 - 0.5) * dx)
}

pub fn density(c: [f64; 3]) -> f64 {
    1.0 + c[0] + 2.0 * c[1]
}

fn hydro_values(c: [f64; 3]) -> Vec<f64> {
    let rho = density(c);
    vec![rho, GAS_VELOCITY[0], GAS_VELOCITY[1], GAS_VELOCITY[2], 0.1 * rho]
}

fn gravity_values(c: [f64; 3]) -> Vec<f64> {
    vec![-density(c), c[0], 1.0, 0.0]
}

#[derive(Debug, Clone, Copy)]
pub struct Cell {
    pub level: usize,
    pub center: [f64; 3],
    pub owner: usize,
}

impl Cell {
    pub fn size(&self) -> f64 {
        0.5f64.powi(self.level as i32)
    }

    pub fn mass(&self) -> f64 {
        density(self.center) * self.size().powi(3)
    }
}

/// Cells a loader returns with the given level window.
pub fn cells(lmin: usize, lmax: usize) -> Vec<Cell> {
    let mut out = Vec::new();
    for o in octs().iter().filter(|o| (lmin..=lmax).contains(&o.level)) {
        for slot in 0..8 {
            if o.son[slot] == 0 || o.level == lmax {
                out.push(Cell {
                    level: o.level,
                    center: slot_center(o, slot),
                    owner: o.owner,
                });
            }
        }
    }
    out
}

#[derive(Debug, Clone, Copy)]
pub struct Particle {
    pub pos: [f64; 3],
    pub vel: [f64; 3],
    pub mass: f64,
    pub id: i32,
    pub family: i8,
    pub birth: f64,
}

/// Particles of each domain.
pub fn particles(icpu: usize) -> Vec<Particle> {
    let p = |pos, mass, id, family, birth| Particle {
        pos,
        vel: [id as f64, 0.0, -1.0],
        mass,
        id,
        family,
        birth,
    };
    match icpu {
        1 => vec![
            p([0.1, 0.2, 0.3], 1.0, 1, 1, 0.0),
            p([0.6, 0.6, 0.6], 2.0, 2, 2, 0.1),
            p([0.9, 0.1, 0.5], 1.5, 3, 1, 0.0),
        ],
        _ => vec![
            p([0.4, 0.8, 0.2], 0.5, 4, 2, 0.2),
            p([0.25, 0.25, 0.25], 1.0, 5, 1, 0.0),
        ],
    }
}

pub fn all_particles() -> Vec<Particle> {
    (1..=NCPU).flat_map(particles).collect()
}

fn amr_file(icpu: usize) -> Vec<u8> {
    let octs = stored(icpu);
    let mut r = Records::default();
    r.i32(NCPU as i32).i32(3).i32s(&[1, 1, 1]);
    r.i32(LEVELMAX as i32).i32(1000).i32(0);
    for _ in 0..15 {
        r.i32(0);
    }
    let mut numbl = vec![0i32; NCPU * LEVELMAX];
    for o in &octs {
        numbl[(o.level - 1) * NCPU + o.owner - 1] += 1;
    }
    r.i32s(&numbl).i32s(&numbl);
    r.i32s(&[0, 0, 0, 0]);
    r.raw(format!("{:<128}", "hilbert").as_bytes());
    r.f64s(&vec![0.0; NCPU + 1]);
    r.i32(1).i32(0).i32(1);

    for level in 1..=LEVELMAX {
        for ibound in 1..=NCPU {
            let block: Vec<&Oct> = octs
                .iter()
                .filter(|o| o.level == level && o.owner == ibound)
                .collect();
            if block.is_empty() {
                continue;
            }
            let n = block.len();
            r.i32s(&(1..=n as i32).collect::<Vec<_>>());
            r.i32s(&vec![0; n]).i32s(&vec![0; n]);
            for k in 0..3 {
                r.f64s(&block.iter().map(|o| o.center[k]).collect::<Vec<_>>());
            }
            for _ in 0..7 {
                r.i32s(&vec![0; n]);
            }
            for slot in 0..8 {
                r.i32s(&block.iter().map(|o| o.son[slot]).collect::<Vec<_>>());
            }
            for _ in 0..16 {
                r.i32s(&vec![ibound as i32; n]);
            }
        }
    }
    r.0
}

fn cell_file(icpu: usize, r: &mut Records, nvar: usize, values: fn([f64; 3]) -> Vec<f64>) {
    let octs = stored(icpu);
    for level in 1..=LEVELMAX {
        for ibound in 1..=NCPU {
            let block: Vec<&Oct> = octs
                .iter()
                .filter(|o| o.level == level && o.owner == ibound)
                .collect();
            r.i32(level as i32).i32(block.len() as i32);
            if block.is_empty() {
                continue;
            }
            for slot in 0..8 {
                for ivar in 0..nvar {
                    r.f64s(
                        &block
                            .iter()
                            .map(|o| values(slot_center(o, slot))[ivar])
                            .collect::<Vec<_>>(),
                    );
                }
            }
        }
    }
}

fn hydro_file(icpu: usize) -> Vec<u8> {
    let mut r = Records::default();
    r.i32(NCPU as i32).i32(5).i32(3).i32(LEVELMAX as i32).i32(0).f64(GAMMA);
    cell_file(icpu, &mut r, 5, hydro_values);
    r.0
}

fn gravity_file(icpu: usize) -> Vec<u8> {
    let mut r = Records::default();
    r.i32(NCPU as i32).i32(4).i32(LEVELMAX as i32).i32(0);
    cell_file(icpu, &mut r, 4, gravity_values);
    r.0
}

fn part_file(icpu: usize) -> Vec<u8> {
    let ps = particles(icpu);
    let mut r = Records::default();
    r.i32(NCPU as i32).i32(3).i32(ps.len() as i32);
    r.i32s(&[1, 2, 3, 4]).i32(2).f64(0.0).f64(0.0).i32(0);
    for k in 0..3 {
        r.f64s(&ps.iter().map(|p| p.pos[k]).collect::<Vec<_>>());
    }
    for k in 0..3 {
        r.f64s(&ps.iter().map(|p| p.vel[k]).collect::<Vec<_>>());
    }
    r.f64s(&ps.iter().map(|p| p.mass).collect::<Vec<_>>());
    r.i32s(&ps.iter().map(|p| p.id).collect::<Vec<_>>());
    r.i32s(&vec![LEVELMAX as i32; ps.len()]);
    r.i8s(&ps.iter().map(|p| p.family).collect::<Vec<_>>());
    r.i8s(&vec![0; ps.len()]);
    r.f64s(&ps.iter().map(|p| p.birth).collect::<Vec<_>>());
    r.0
}

const HYDRO_DESCRIPTOR: &str = "# version:  1
# ivar, variable_name, variable_type
  1, density, d
  2, velocity_x, d
  3, velocity_y, d
  4, velocity_z, d
  5, pressure, d
";

const PART_DESCRIPTOR: &str = "# version:  1
# ivar, variable_name, variable_type
  1, position_x, d
  2, position_y, d
  3, position_z, d
  4, velocity_x, d
  5, velocity_y, d
  6, velocity_z, d
  7, mass, d
  8, identity, i
  9, levelp, i
 10, family, b
 11, tag, b
 12, birth_time, d
";

const CLUMP_HEADER: &str =
    "   index  lev   parent      ncell    peak_x    peak_y    peak_z     rho-     rho+   rho_av   mass_cl  relevance";

pub const CLUMPS: [[f64; 12]; 2] = [
    [1.0, 0.0, 1.0, 12.0, 0.25, 0.25, 0.25, 0.1, 5.0, 1.2, 3.0, 2.5],
    [2.0, 0.0, 2.0, 8.0, 0.75, 0.5, 0.6, 0.2, 4.0, 1.1, 1.5, 1.8],
];

fn info_text() -> String {
    format!(
        "ncpu        =          {NCPU}
ndim        =          3
levelmin    =          {LEVELMIN}
levelmax    =          {LEVELMAX}
ngridmax    =       1000
nstep_coarse=         42

boxlen      =  0.100000000000000E+01
time        =  {TIME:E}
aexp        =  0.100000000000000E+01
H0          =  0.100000000000000E+01
omega_m     =  0.100000000000000E+01
omega_l     =  0.000000000000000E+00
omega_k     =  0.000000000000000E+00
omega_b     =  0.000000000000000E+00
unit_l      =  {UNIT_L:E}
unit_d      =  {UNIT_D:E}
unit_t      =  {UNIT_T:E}

ordering type=hilbert
   DOMAIN   ind_min                 ind_max
       1   0.000000000000000E+00   0.400000000000000E+01
       2   0.400000000000000E+01   0.800000000000000E+01
"
    )
}

pub struct Snapshot {
    pub dir: TempDir,
}

impl Snapshot {
    /// Write output 1 with amr, hydro, gravity, particle and clump files.
    pub fn write() -> Self {
        Self::write_with(true)
    }

    /// Same snapshot, run without the clump finder.
    pub fn without_clumps() -> Self {
        Self::write_with(false)
    }

    fn write_with(clumps: bool) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join(format!("output_{OUTPUT:05}"));
        std::fs::create_dir_all(&out).unwrap();
        let put = |name: String, bytes: &[u8]| std::fs::write(out.join(name), bytes).unwrap();

        put(format!("info_{OUTPUT:05}.txt"), info_text().as_bytes());
        put("hydro_file_descriptor.txt".into(), HYDRO_DESCRIPTOR.as_bytes());
        put("part_file_descriptor.txt".into(), PART_DESCRIPTOR.as_bytes());
        for icpu in 1..=NCPU {
            let tag = format!("{OUTPUT:05}.out{icpu:05}");
            put(format!("amr_{tag}"), &amr_file(icpu));
            put(format!("hydro_{tag}"), &hydro_file(icpu));
            put(format!("grav_{tag}"), &gravity_file(icpu));
            put(format!("part_{tag}"), &part_file(icpu));
            if !clumps {
                continue;
            }

            let row: Vec<String> = CLUMPS[icpu - 1].iter().map(|v| format!("{v:E}")).collect();
            let text = format!("{CLUMP_HEADER}\n{}\n", row.join("  "));
            put(format!("clump_{OUTPUT:05}.txt{icpu:05}"), text.as_bytes());
        }
        Self { dir }
    }

    pub fn base(&self) -> &Path {
        self.dir.path()
    }

    pub fn info(&self) -> Arc<InfoRecord> {
        Arc::new(InfoRecord::resolve(self.base(), OUTPUT).unwrap())
    }

    pub fn file(&self, name: &str) -> std::path::PathBuf {
        self.base().join(format!("output_{OUTPUT:05}")).join(name)
    }
}

pub fn close(a: f64, b: f64, rel: f64) -> bool {
    (a - b).abs() <= rel * a.abs().max(b.abs()).max(f64::MIN_POSITIVE)
}
