// In-process stand-in for a KSP game running the kRPC server. It speaks the
// real wire protocol and models the RCS behaviour the suite checks.

#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{Arc, Mutex, MutexGuard},
    thread,
};

use bytes::Buf;
use krpc_rcs::{
    config::Config,
    fixtures::{LINEAR_PORT, THRUSTER_BLOCK, VERNOR},
    krpc::{
        self,
        codec::{encode_to_vec, read_message, write_message},
        schema::{
            self, ConnectionRequest, ConnectionResponse, ConnectionStatus, ConnectionType,
            ProcedureCall, ProcedureResult, Request, Response, Status,
        },
    },
};
use prost::encoding::decode_varint;

pub const VESSEL: u64 = 1;
pub const CONTROL: u64 = 2;
pub const PARTS: u64 = 3;
pub const RESOURCES: u64 = 4;

const RCS_BASE: u64 = 100;
const PART_BASE: u64 = 200;
const RESOURCE_BASE: u64 = 300;
const THRUSTER_BASE: u64 = 1000;

/// Altitude above which Kerbin has no atmosphere
const ATMOSPHERE_HEIGHT: f64 = 70_000.0;

const AXES: [&str; 6] = [
    "PitchEnabled",
    "YawEnabled",
    "RollEnabled",
    "ForwardEnabled",
    "UpEnabled",
    "RightEnabled",
];

#[derive(Debug, Clone)]
pub struct FakeRcs {
    pub title: String,
    pub enabled: bool,
    pub axes: [bool; 6],
    pub shielded: bool,
    pub thrusters: u64,
    pub propellants: Vec<(String, f32)>,
    pub max_vacuum_thrust: f32,
    pub pad_thrust: f32,
    pub vacuum_isp: f32,
    pub sea_level_isp: f32,
    pub pad_isp: f32,
}

impl FakeRcs {
    fn new(title: &str, propellants: &[(&str, f32)]) -> Self {
        Self {
            title: title.to_string(),
            enabled: true,
            axes: [true; 6],
            shielded: false,
            thrusters: 1,
            propellants: propellants
                .iter()
                .map(|(name, ratio)| (name.to_string(), *ratio))
                .collect(),
            max_vacuum_thrust: 0.0,
            pad_thrust: 0.0,
            vacuum_isp: 0.0,
            sea_level_isp: 0.0,
            pad_isp: 0.0,
        }
    }

    pub fn linear_port() -> Self {
        Self {
            max_vacuum_thrust: 2000.0,
            pad_thrust: 842.3,
            vacuum_isp: 240.0,
            sea_level_isp: 100.0,
            pad_isp: 101.02,
            ..Self::new(LINEAR_PORT, &[("MonoPropellant", 1.0)])
        }
    }

    pub fn thruster_block() -> Self {
        Self {
            thrusters: 4,
            max_vacuum_thrust: 1000.0,
            pad_thrust: 420.4,
            vacuum_isp: 240.0,
            sea_level_isp: 100.0,
            pad_isp: 101.02,
            ..Self::new(THRUSTER_BLOCK, &[("MonoPropellant", 1.0)])
        }
    }

    pub fn vernor() -> Self {
        Self {
            max_vacuum_thrust: 12000.0,
            pad_thrust: 6503.2,
            vacuum_isp: 260.0,
            sea_level_isp: 140.0,
            pad_isp: 140.93,
            ..Self::new(VERNOR, &[("LiquidFuel", 0.818_181_8), ("Oxidizer", 1.0)])
        }
    }
}

#[derive(Debug, Clone)]
pub struct FakeResource {
    pub name: String,
    pub enabled: bool,
}

/// Misbehaviour injected into the RCS model
#[derive(Debug, Clone, Copy, Default)]
pub struct Faults {
    /// Writing the first axis flag also clears the second
    pub coupled_axes: Option<(usize, usize)>,
    /// `HasFuel` stays true whatever the resources say
    pub stuck_fuel_gauge: bool,
    /// `Active` only looks at the RCS action group
    pub active_ignores_enabled: bool,
}

#[derive(Debug)]
pub struct GameState {
    /// Empty when no vessel is active
    pub vessel_name: String,
    pub rcs_group: bool,
    pub orbit_altitude: Option<f64>,
    pub rcs: Vec<FakeRcs>,
    pub resources: Vec<FakeResource>,

    /// RCS modules of the test craft, copied onto the pad at every launch
    pub craft: Vec<FakeRcs>,
    /// Number of active vessel lookups that fail after a launch
    pub launch_delay_polls: usize,
    pending_polls: usize,

    pub refuse_connections: bool,
    pub faults: Faults,
    pub clients: Vec<String>,
    pub calls: Vec<String>,
    pub launches: usize,
    pub saves_loaded: usize,
}

impl GameState {
    /// Test craft already on the launch pad
    pub fn parts_rcs() -> Self {
        let mut state = Self::empty();
        state.launch("PartsRCS");
        state.launches = 0;
        state
    }

    /// Nothing loaded yet
    pub fn empty() -> Self {
        Self {
            vessel_name: String::new(),
            rcs_group: false,
            orbit_altitude: None,
            rcs: Vec::new(),
            resources: Vec::new(),
            craft: vec![
                FakeRcs::vernor(),
                FakeRcs::linear_port(),
                FakeRcs::thruster_block(),
                FakeRcs::linear_port(),
            ],
            launch_delay_polls: 0,
            pending_polls: 0,
            refuse_connections: false,
            faults: Faults::default(),
            clients: Vec::new(),
            calls: Vec::new(),
            launches: 0,
            saves_loaded: 0,
        }
    }

    pub fn with_vessel(name: &str) -> Self {
        let mut state = Self::empty();
        state.vessel_name = name.to_string();
        state
    }

    pub fn called(&self, procedure: &str) -> bool {
        self.calls.iter().any(|c| c == procedure)
    }

    fn launch(&mut self, name: &str) {
        self.vessel_name = name.to_string();
        self.rcs_group = false;
        self.orbit_altitude = None;
        self.pending_polls = self.launch_delay_polls;
        self.launches += 1;

        if name == "PartsRCS" {
            self.rcs = self.craft.clone();
            self.resources = ["MonoPropellant", "LiquidFuel", "Oxidizer", "ElectricCharge"]
                .iter()
                .map(|name| FakeResource {
                    name: name.to_string(),
                    enabled: true,
                })
                .collect();
        } else {
            self.rcs.clear();
            self.resources.clear();
        }
    }

    fn load_save(&mut self) {
        self.vessel_name.clear();
        self.rcs.clear();
        self.resources.clear();
        self.orbit_altitude = None;
        self.saves_loaded += 1;
    }

    fn in_vacuum(&self) -> bool {
        self.orbit_altitude.is_some_and(|alt| alt > ATMOSPHERE_HEIGHT)
    }

    fn has_fuel(&self, rcs: &FakeRcs) -> bool {
        if self.faults.stuck_fuel_gauge {
            return true;
        }

        rcs.propellants.iter().all(|(propellant, _)| {
            self.resources
                .iter()
                .any(|r| r.name == *propellant && r.enabled)
        })
    }

    fn handle(&mut self, call: &ProcedureCall) -> ProcedureResult {
        self.calls
            .push(format!("{}.{}", call.service, call.procedure));

        match self.dispatch(call) {
            Ok(value) => ProcedureResult { error: None, value },
            Err(description) => ProcedureResult {
                error: Some(schema::Error {
                    service: call.service.clone(),
                    name: "InvalidOperationException".to_string(),
                    description,
                    stack_trace: String::new(),
                }),
                value: Vec::new(),
            },
        }
    }

    fn dispatch(&mut self, call: &ProcedureCall) -> Result<Vec<u8>, String> {
        match (call.service.as_str(), call.procedure.as_str()) {
            ("KRPC", "GetStatus") => Ok(prost::Message::encode_to_vec(&Status {
                version: "0.5.4".to_string(),
            })),
            ("TestingTools", "LoadSave") => {
                arg_string(call, 0)?;
                arg_string(call, 1)?;
                self.load_save();
                Ok(Vec::new())
            }
            ("TestingTools", "RemoveOtherVessels") => Ok(Vec::new()),
            ("TestingTools", "SetCircularOrbit") => {
                arg_string(call, 0)?;
                self.orbit_altitude = Some(arg_f64(call, 1)?);
                Ok(Vec::new())
            }
            ("SpaceCenter", "get_ActiveVessel") => {
                if self.pending_polls > 0 {
                    self.pending_polls -= 1;
                    return Err("Vessel is being launched".to_string());
                }
                let id = if self.vessel_name.is_empty() { 0 } else { VESSEL };
                Ok(encode_to_vec(&id))
            }
            ("SpaceCenter", "LaunchVesselFromVAB") => {
                let name = arg_string(call, 0)?;
                self.launch(&name);
                Ok(Vec::new())
            }
            ("SpaceCenter", procedure) => self.class_procedure(call, procedure),
            (service, procedure) => Err(format!("Procedure not found: {service}.{procedure}")),
        }
    }

    fn class_procedure(&mut self, call: &ProcedureCall, procedure: &str) -> Result<Vec<u8>, String> {
        let not_found = || format!("Procedure not found: SpaceCenter.{procedure}");

        let (class, rest) = procedure.split_once('_').ok_or_else(not_found)?;
        let (access, property) = rest.split_once('_').ok_or_else(not_found)?;
        let id = arg_u64(call, 0)?;

        match (class, access, property) {
            ("Vessel", "get", property) => {
                expect_id(id, VESSEL)?;
                match property {
                    "Name" => Ok(encode_to_vec(&self.vessel_name)),
                    "Control" => Ok(encode_to_vec(&CONTROL)),
                    "Parts" => Ok(encode_to_vec(&PARTS)),
                    "Resources" => Ok(encode_to_vec(&RESOURCES)),
                    _ => Err(not_found()),
                }
            }
            ("Control", "get", "RCS") => {
                expect_id(id, CONTROL)?;
                Ok(encode_to_vec(&self.rcs_group))
            }
            ("Control", "set", "RCS") => {
                expect_id(id, CONTROL)?;
                self.rcs_group = arg_bool(call, 1)?;
                Ok(Vec::new())
            }
            ("Parts", "get", "RCS") => {
                expect_id(id, PARTS)?;
                let ids: Vec<u64> = (0..self.rcs.len() as u64).map(|i| RCS_BASE + i).collect();
                Ok(encode_to_vec(&ids))
            }
            ("Part", "get", property) => {
                let rcs = lookup(&self.rcs, id, PART_BASE)?;
                match property {
                    "Title" => Ok(encode_to_vec(&rcs.title)),
                    "Shielded" => Ok(encode_to_vec(&rcs.shielded)),
                    _ => Err(not_found()),
                }
            }
            ("Thruster", "get", "Part") => {
                let index = id
                    .checked_sub(THRUSTER_BASE)
                    .map(|i| i / 10)
                    .filter(|i| *i < self.rcs.len() as u64)
                    .ok_or_else(|| format!("No such thruster {id}"))?;
                Ok(encode_to_vec(&(PART_BASE + index)))
            }
            ("RCS", "get", property) => self.rcs_get(id, property).ok_or_else(not_found)?,
            ("RCS", "set", property) => {
                let value = arg_bool(call, 1)?;
                let index = index(&self.rcs, id, RCS_BASE)?;
                let coupled = self.faults.coupled_axes;
                let rcs = &mut self.rcs[index];

                if property == "Enabled" {
                    rcs.enabled = value;
                } else {
                    let axis = AXES
                        .iter()
                        .position(|a| *a == property)
                        .ok_or_else(not_found)?;
                    rcs.axes[axis] = value;
                    if let Some((_, to)) = coupled.filter(|(from, _)| *from == axis) {
                        rcs.axes[to] = false;
                    }
                }
                Ok(Vec::new())
            }
            ("Resources", "get", "All") => {
                expect_id(id, RESOURCES)?;
                let ids: Vec<u64> = (0..self.resources.len() as u64)
                    .map(|i| RESOURCE_BASE + i)
                    .collect();
                Ok(encode_to_vec(&ids))
            }
            ("Resource", "get", property) => {
                let resource = lookup(&self.resources, id, RESOURCE_BASE)?;
                match property {
                    "Name" => Ok(encode_to_vec(&resource.name)),
                    "Enabled" => Ok(encode_to_vec(&resource.enabled)),
                    _ => Err(not_found()),
                }
            }
            ("Resource", "set", "Enabled") => {
                let value = arg_bool(call, 1)?;
                let index = index(&self.resources, id, RESOURCE_BASE)?;
                self.resources[index].enabled = value;
                Ok(Vec::new())
            }
            _ => Err(not_found()),
        }
    }

    /// `None` when the property does not exist
    fn rcs_get(&self, id: u64, property: &str) -> Option<Result<Vec<u8>, String>> {
        let index = match index(&self.rcs, id, RCS_BASE) {
            Ok(index) => index,
            Err(e) => return Some(Err(e)),
        };
        let rcs = &self.rcs[index];
        let vacuum = self.in_vacuum();

        let value = match property {
            "Part" => encode_to_vec(&(PART_BASE + index as u64)),
            "Active" => {
                let enabled = rcs.enabled || self.faults.active_ignores_enabled;
                encode_to_vec(&(self.rcs_group && enabled && !rcs.shielded))
            }
            "Enabled" => encode_to_vec(&rcs.enabled),
            "MaxThrust" => encode_to_vec(&if vacuum {
                rcs.max_vacuum_thrust
            } else {
                rcs.pad_thrust
            }),
            "MaxVacuumThrust" => encode_to_vec(&rcs.max_vacuum_thrust),
            "Thrusters" => {
                let first = THRUSTER_BASE + 10 * index as u64;
                let ids: Vec<u64> = (0..rcs.thrusters).map(|t| first + t).collect();
                encode_to_vec(&ids)
            }
            "SpecificImpulse" => encode_to_vec(&if vacuum { rcs.vacuum_isp } else { rcs.pad_isp }),
            "VacuumSpecificImpulse" => encode_to_vec(&rcs.vacuum_isp),
            "KerbinSeaLevelSpecificImpulse" => encode_to_vec(&rcs.sea_level_isp),
            "Propellants" => {
                let names: Vec<String> = rcs.propellants.iter().map(|(n, _)| n.clone()).collect();
                encode_to_vec(&names)
            }
            "PropellantRatios" => {
                let ratios: BTreeMap<String, f32> = rcs.propellants.iter().cloned().collect();
                encode_to_vec(&ratios)
            }
            "HasFuel" => encode_to_vec(&self.has_fuel(rcs)),
            axis => {
                let axis = AXES.iter().position(|a| *a == axis)?;
                encode_to_vec(&rcs.axes[axis])
            }
        };

        Some(Ok(value))
    }
}

fn expect_id(id: u64, expected: u64) -> Result<(), String> {
    if id == expected {
        Ok(())
    } else {
        Err(format!("Object {id} is not of the expected class"))
    }
}

fn index<T>(items: &[T], id: u64, base: u64) -> Result<usize, String> {
    id.checked_sub(base)
        .map(|i| i as usize)
        .filter(|i| *i < items.len())
        .ok_or_else(|| format!("No such object {id}"))
}

fn lookup<T>(items: &[T], id: u64, base: u64) -> Result<&T, String> {
    index(items, id, base).map(|i| &items[i])
}

fn arg(call: &ProcedureCall, position: u32) -> Result<&[u8], String> {
    call.arguments
        .iter()
        .find(|a| a.position == position)
        .map(|a| a.value.as_slice())
        .ok_or_else(|| format!("Missing argument {position} for {}", call.procedure))
}

fn arg_u64(call: &ProcedureCall, position: u32) -> Result<u64, String> {
    let mut buf = arg(call, position)?;
    decode_varint(&mut buf).map_err(|e| e.to_string())
}

fn arg_bool(call: &ProcedureCall, position: u32) -> Result<bool, String> {
    Ok(arg_u64(call, position)? != 0)
}

fn arg_f64(call: &ProcedureCall, position: u32) -> Result<f64, String> {
    let mut buf = arg(call, position)?;
    if buf.remaining() < 8 {
        return Err("Truncated double".to_string());
    }
    Ok(buf.get_f64_le())
}

fn arg_string(call: &ProcedureCall, position: u32) -> Result<String, String> {
    let mut buf = arg(call, position)?;
    let len = decode_varint(&mut buf).map_err(|e| e.to_string())? as usize;
    let bytes = buf.get(..len).ok_or("Truncated string")?;
    String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())
}

pub struct FakeKsp {
    addr: SocketAddr,
    state: Arc<Mutex<GameState>>,
}

impl FakeKsp {
    pub fn start(state: GameState) -> Self {
        let _ = pretty_env_logger::try_init();

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let state = Arc::new(Mutex::new(state));

        let shared = state.clone();
        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let state = shared.clone();
                thread::spawn(move || serve(stream, state));
            }
        });

        Self { addr, state }
    }

    /// Configuration pointing at this server, with no settle delay
    pub fn config(&self) -> Config {
        let mut config = Config::default();
        config.connection.address = self.addr.ip().to_string();
        config.connection.rpc_port = self.addr.port();
        config.connection.timeout_ms = 5_000;
        config.suite.settle_ms = 0;
        config.suite.launch_timeout_ms = 2_000;
        config
    }

    pub fn state(&self) -> MutexGuard<'_, GameState> {
        self.state.lock().unwrap()
    }
}

fn serve(mut stream: TcpStream, state: Arc<Mutex<GameState>>) -> Result<(), krpc::Error> {
    let request: ConnectionRequest = read_message(&mut stream)?;

    let response = {
        let mut state = state.lock().unwrap();

        if state.refuse_connections {
            ConnectionResponse {
                status: ConnectionStatus::MalformedMessage as i32,
                message: "Connection refused by test".to_string(),
                client_identifier: Vec::new(),
            }
        } else if request.kind != ConnectionType::Rpc as i32 {
            ConnectionResponse {
                status: ConnectionStatus::WrongType as i32,
                message: "Expected an RPC connection".to_string(),
                client_identifier: Vec::new(),
            }
        } else {
            state.clients.push(request.client_name.clone());
            ConnectionResponse {
                status: ConnectionStatus::Ok as i32,
                message: String::new(),
                client_identifier: vec![0xab; 16],
            }
        }
    };

    let accepted = response.status == ConnectionStatus::Ok as i32;
    write_message(&mut stream, &response)?;
    if !accepted {
        return Ok(());
    }

    // A read error means the client hung up
    while let Ok(request) = read_message::<Request>(&mut stream) {
        let results = {
            let mut state = state.lock().unwrap();
            request.calls.iter().map(|call| state.handle(call)).collect()
        };

        write_message(
            &mut stream,
            &Response {
                error: None,
                results,
            },
        )?;
    }

    Ok(())
}
