/*
 * SPDX-FileCopyrightText: Copyright (c) 2023 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
 * SPDX-License-Identifier: MIT
 *
 * Permission is hereby granted, free of charge, to any person obtaining a
 * copy of this software and associated documentation files (the "Software"),
 * to deal in the Software without restriction, including without limitation
 * the rights to use, copy, modify, merge, publish, distribute, sublicense,
 * and/or sell copies of the Software, and to permit persons to whom the
 * Software is furnished to do so, subject to the following conditions:
 *
 * The above copyright notice and this permission notice shall be included in
 * all copies or substantial portions of the Software.
 *
 * THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
 * IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
 * FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL
 * THE AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
 * LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING
 * FROM, OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER
 * DEALINGS IN THE SOFTWARE.
 */
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::parse::{self, Field};
use crate::RacadmError;

pub const VIRTUAL_DISKS_COMMAND: &str = "racadm raid get vdisks -o";
pub const PHYSICAL_DISKS_COMMAND: &str = "racadm raid get pdisks -o";

/// Each record in `raid get vdisks -o` starts with its FQDD, `Disk.Virtual.N:RAID...`
pub const VIRTUAL_DISK_DELIMITER: &str = "Disk.Virtual.";
/// Each record in `raid get pdisks -o` starts with its FQDD, `Disk.Bay.N:Enclosure...`
pub const PHYSICAL_DISK_DELIMITER: &str = "Disk.Bay.";

const NAME: Field = Field::line("Name                             = ");
const SIZE: Field = Field::line("Size                             = ");
const LAYOUT: Field = Field::line("Layout                           = ");

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualDisk {
    pub name: String,
    pub size: String,
    /// RAID level, e.g. "Raid-1"
    pub layout: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhysicalDisk {
    pub name: String,
    pub size: String,
}

/// Virtual disks in the order racadm lists them.
pub fn parse_virtual_disks(dump: &str) -> Result<Vec<VirtualDisk>, RacadmError> {
    parse::records(dump, VIRTUAL_DISK_DELIMITER)
        .map(|disk| {
            Ok(VirtualDisk {
                name: parse::extract_owned(disk, &NAME)?,
                size: parse::extract_owned(disk, &SIZE)?,
                layout: parse::extract_owned(disk, &LAYOUT)?,
            })
        })
        .collect()
}

/// Physical disks in the order racadm lists them.
pub fn parse_physical_disks(dump: &str) -> Result<Vec<PhysicalDisk>, RacadmError> {
    parse::records(dump, PHYSICAL_DISK_DELIMITER)
        .map(|disk| {
            Ok(PhysicalDisk {
                name: parse::extract_owned(disk, &NAME)?,
                size: parse::extract_owned(disk, &SIZE)?,
            })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInventory {
    pub virtual_disks: Vec<VirtualDisk>,
    pub physical_disks: Vec<PhysicalDisk>,
}

impl fmt::Display for DiskInventory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.virtual_disks.is_empty() {
            writeln!(f, "Couldn't find any Virtual Disks")?;
        } else {
            writeln!(f, "Virtual Disks:")?;
            for (i, d) in self.virtual_disks.iter().enumerate() {
                writeln!(
                    f,
                    "Disk {i}: Name:{} Size: {} Raid: {}",
                    d.name, d.size, d.layout
                )?;
            }
        }
        if self.physical_disks.is_empty() {
            writeln!(f, "Couldn't find any Physical Disks")
        } else {
            writeln!(f, "Physical Disks:")?;
            for (i, d) in self.physical_disks.iter().enumerate() {
                writeln!(f, "Disk {i}: Name:{} Size: {}", d.name, d.size)?;
            }
            Ok(())
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_virtual_disks_parser() {
        let test_data = include_str!("testdata/vdisks.txt").replace('\n', "\r\n");
        let result = parse_virtual_disks(&test_data).unwrap();
        assert_eq!(
            result,
            vec![
                VirtualDisk {
                    name: "OS".to_string(),
                    size: "446.63 GB".to_string(),
                    layout: "Raid-1".to_string(),
                },
                VirtualDisk {
                    name: "Data".to_string(),
                    size: "3.27 TB".to_string(),
                    layout: "Raid-5".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_physical_disks_parser() {
        let test_data = include_str!("testdata/pdisks.txt").replace('\n', "\r\n");
        let result = parse_physical_disks(&test_data).unwrap();
        let names: Vec<&str> = result.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Physical Disk 0:1:0",
                "Physical Disk 0:1:1",
                "Physical Disk 0:1:2"
            ]
        );
        assert_eq!(result[2].size, "1.09 TB");
    }

    #[test]
    fn test_bare_newlines() {
        let result = parse_virtual_disks(include_str!("testdata/vdisks.txt")).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[1].name, "Data");
        assert_eq!(result[1].size, "3.27 TB");
        let result = parse_physical_disks(include_str!("testdata/pdisks.txt")).unwrap();
        assert_eq!(result[2].size, "1.09 TB");
    }

    #[test]
    fn test_no_disks() {
        let dump = "racadm raid get vdisks -o\r\nERROR: STOR0101 : No virtual disks are displayed.\r\n/admin1-> ";
        assert!(parse_virtual_disks(dump).unwrap().is_empty());
    }

    #[test]
    fn test_disk_missing_field() {
        let dump = "racadm raid get vdisks -o\r\nDisk.Virtual.0:RAID.Integrated.1-1\r\n   Status = Ok\r\n";
        assert!(matches!(
            parse_virtual_disks(dump),
            Err(RacadmError::FieldNotFound { .. })
        ));
    }

    #[test]
    fn test_inventory_report() {
        let inventory = DiskInventory {
            virtual_disks: vec![VirtualDisk {
                name: "OS".to_string(),
                size: "446.63 GB".to_string(),
                layout: "Raid-1".to_string(),
            }],
            physical_disks: vec![],
        };
        assert_eq!(
            inventory.to_string(),
            "Virtual Disks:\nDisk 0: Name:OS Size: 446.63 GB Raid: Raid-1\nCouldn't find any Physical Disks\n"
        );
    }
}
