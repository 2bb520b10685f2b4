//! In-process stand-in for a kernel module
//!
//! Behaves like the list/stack/bitmap/search modules: parameter writes to
//! `cmd` execute a command and append `"<module>: ..."` lines to a log.

use std::collections::HashMap;

use async_trait::async_trait;
use modcheck::{CommandChannel, Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    List,
    Stack,
    Bitmap,
    Search,
}

const BITS: usize = 8;
const NR_VAL: i64 = 100;

#[derive(Debug)]
pub struct SimModule {
    name: String,
    kind: Kind,
    log: Vec<String>,
    params: HashMap<String, String>,
    loaded: bool,
    items: Vec<i64>,
    bits: [bool; BITS],
    sorted: bool,
    /// Every channel call, in order
    pub calls: Vec<String>,
    pub loads: usize,
    pub unloads: usize,
    /// A `cmd` write with this value fails like a denied sysfs write
    pub fail_cmd: Option<String>,
    pub fail_load: bool,
    /// Print the array without its values
    pub hide_listing: bool,
    /// Log reads from this one on (1-based) fail like a denied `dmesg`
    pub fail_reads_from: Option<usize>,
    reads: usize,
}

impl SimModule {
    pub fn new(name: &str, kind: Kind) -> Self {
        Self {
            name: name.to_string(),
            kind,
            log: Vec::new(),
            params: HashMap::new(),
            loaded: false,
            items: Vec::new(),
            bits: [false; BITS],
            sorted: false,
            calls: Vec::new(),
            loads: 0,
            unloads: 0,
            fail_cmd: None,
            fail_load: false,
            hide_listing: false,
            fail_reads_from: None,
            reads: 0,
        }
    }

    fn emit(&mut self, line: impl AsRef<str>) {
        self.log.push(format!("{}: {}", self.name, line.as_ref()));
    }

    fn value(&self, key: &str) -> i64 {
        self.params
            .get(key)
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(0)
    }

    fn joined(values: impl Iterator<Item = i64>) -> String {
        values.map(|v| v.to_string()).collect::<Vec<_>>().join(" ")
    }

    fn execute(&mut self, cmd: &str) {
        self.emit(format!("Executing command: {}", cmd));
        match self.kind {
            Kind::List => self.list(cmd),
            Kind::Stack => self.stack(cmd),
            Kind::Bitmap => self.bitmap(cmd),
            Kind::Search => self.search(cmd),
        }
    }

    fn list(&mut self, cmd: &str) {
        let value = self.value("value");
        match cmd {
            "add" => {
                self.items.push(value);
                self.emit(format!("Added item: {}", value));
            }
            "print" => {
                let line = format!("List contents: {}", Self::joined(self.items.iter().copied()));
                self.emit(line);
            }
            "find" => {
                if self.items.contains(&value) {
                    self.emit(format!("Item {} found in list", value));
                } else {
                    self.emit(format!("Item {} not found in list", value));
                }
            }
            "swap" => match self.items.iter().position(|&v| v == value) {
                Some(i) if i + 1 < self.items.len() => {
                    self.items.swap(i, i + 1);
                    let line = format!("Swapped items: {} and {}", self.items[i], self.items[i + 1]);
                    self.emit(line);
                }
                _ => self.emit("Swap failed"),
            },
            "reverse" => {
                self.items.reverse();
                self.emit("List reversed");
            }
            "del" => match self.items.iter().position(|&v| v == value) {
                Some(i) => {
                    self.items.remove(i);
                    self.emit(format!("Deleted item: {}", value));
                }
                None => self.emit(format!("Item {} not found", value)),
            },
            other => self.emit(format!("Unknown command: {}", other)),
        }
    }

    fn stack(&mut self, cmd: &str) {
        match cmd {
            "push" => {
                let value = self.value("value");
                self.items.push(value);
                self.emit(format!("Pushed: {}", value));
            }
            "pop" => match self.items.pop() {
                Some(v) => self.emit(format!("Popped: {}", v)),
                None => self.emit("Stack underflow"),
            },
            "print" => {
                if self.items.is_empty() {
                    self.emit("Stack is empty");
                } else {
                    let line = format!(
                        "Stack contents (top to bottom): {}",
                        Self::joined(self.items.iter().rev().copied())
                    );
                    self.emit(line);
                }
            }
            "clear" => {
                self.items.clear();
                self.emit("Stack cleared");
            }
            other => self.emit(format!("Unknown command: {}", other)),
        }
    }

    fn bitmap(&mut self, cmd: &str) {
        let index = self.value("index") as usize;
        match cmd {
            "set" => {
                self.bits[index] = true;
                self.emit(format!("Bit {} set", index));
            }
            "clear" => {
                self.bits[index] = false;
                self.emit(format!("Bit {} cleared", index));
            }
            "flip" => {
                self.bits[index] = !self.bits[index];
                self.emit(format!("Bit {} flipped", index));
            }
            "test" => {
                let state = if self.bits[index] { "is set" } else { "is not set" };
                self.emit(format!("Bit {} {}", index, state));
            }
            "print" => {
                let bits: String = self.bits.iter().map(|&b| if b { '1' } else { '0' }).collect();
                self.emit(format!("Current bitmap: {}", bits));
            }
            "find_set" => {
                let pos = self.bits.iter().position(|&b| b).unwrap_or(BITS);
                self.emit(format!("First set bit found at position {}", pos));
            }
            "find_zero" => {
                let pos = self.bits.iter().position(|&b| !b).unwrap_or(BITS);
                self.emit(format!("First zero bit found at position {}", pos));
            }
            "count" => {
                let count = self.bits.iter().filter(|&&b| b).count();
                self.emit(format!("Number of set bits: {}", count));
            }
            "set_all" => {
                self.bits = [true; BITS];
                self.emit("All bits set");
            }
            "clear_all" => {
                self.bits = [false; BITS];
                self.emit("All bits cleared");
            }
            other => self.emit(format!("Unknown command: {}", other)),
        }
    }

    fn search(&mut self, cmd: &str) {
        match cmd {
            "init" => {
                // 37 is coprime with 100, so this permutes 0..99
                self.items = (0..NR_VAL).map(|i| (i * 37 + 11) % NR_VAL).collect();
                self.sorted = false;
                self.emit(format!("Initialized array with {} random elements", NR_VAL));
            }
            "sort" => {
                self.items.sort_unstable();
                self.sorted = true;
                self.emit("Array sorted");
            }
            "print" => {
                let values = if self.hide_listing {
                    String::new()
                } else {
                    format!(" {}", Self::joined(self.items.iter().copied()))
                };
                let line = format!("Current array ({} elements):{}", self.items.len(), values);
                self.emit(line);
                let sorted = self.items.windows(2).all(|w| w[0] <= w[1]);
                self.emit(format!("Array is {}", if sorted { "sorted" } else { "NOT sorted" }));
            }
            "search" => {
                let value = self.value("value");
                if !self.sorted {
                    self.emit("Array not sorted, cannot perform binary search");
                } else if self.items.binary_search(&value).is_ok() {
                    self.emit(format!("Value {} found in array", value));
                } else {
                    self.emit(format!("Value {} not found in array", value));
                }
            }
            other => self.emit(format!("Unknown command: {}", other)),
        }
    }
}

#[async_trait]
impl CommandChannel for SimModule {
    fn module(&self) -> &str {
        &self.name
    }

    async fn load(&mut self) -> Result<()> {
        self.calls.push("load".to_string());
        if self.fail_load {
            return Err(Error::execution("load", 1, "modprobe: ERROR: could not insert module"));
        }
        self.loads += 1;
        self.loaded = true;
        let line = format!("{} module loaded", self.name);
        self.emit(line);
        Ok(())
    }

    async fn unload(&mut self) -> Result<()> {
        self.calls.push("unload".to_string());
        self.unloads += 1;
        self.loaded = false;
        let line = format!("{} module unloaded", self.name);
        self.emit(line);
        Ok(())
    }

    async fn write_parameter(&mut self, key: &str, value: &str) -> Result<()> {
        self.calls.push(format!("write {}={}", key, value));
        if !self.loaded {
            return Err(Error::execution(
                &format!("write parameter '{}'", key),
                1,
                "tee: No such file or directory",
            ));
        }
        if key == "cmd" && self.fail_cmd.as_deref() == Some(value) {
            return Err(Error::execution("write parameter 'cmd'", 1, "tee: Permission denied"));
        }
        self.params.insert(key.to_string(), value.to_string());
        if key == "cmd" {
            self.execute(value);
        } else {
            let line = format!("Param {} set to: {}", key, value);
            self.emit(line);
        }
        Ok(())
    }

    async fn read_log(&mut self) -> Result<String> {
        self.calls.push("read".to_string());
        self.reads += 1;
        if self.fail_reads_from.is_some_and(|n| self.reads >= n) {
            return Err(Error::execution(
                "read log",
                1,
                "dmesg: read kernel buffer failed: Operation not permitted",
            ));
        }
        Ok(self.log.join("\n"))
    }

    async fn clear_log(&mut self) -> Result<()> {
        self.calls.push("clear".to_string());
        self.log.clear();
        Ok(())
    }
}
